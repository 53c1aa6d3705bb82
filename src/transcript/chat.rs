use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, TranscriptUpdate};

/// One chat bubble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
}

/// Ordered chat bubbles with in-place streaming updates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one transcript update into the log.
    pub fn apply(&mut self, update: &TranscriptUpdate) {
        if update.text.trim().is_empty() {
            return;
        }

        if let Some(last) = self.messages.last_mut() {
            if last.role == update.role && !last.is_final {
                last.text.clone_from(&update.text);
                last.is_final = update.is_final;
                return;
            }
            last.is_final = true;
        }

        self.messages.push(ChatMessage {
            role: update.role,
            text: update.text.clone(),
            timestamp: Utc::now(),
            is_final: update.is_final,
        });
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(log: &mut ChatLog, role: Role, text: &str, is_final: bool) {
        log.apply(&TranscriptUpdate::new(role, text, is_final));
    }

    #[test]
    fn test_streaming_updates_collapse_into_one_entry() {
        let mut log = ChatLog::new();
        feed(&mut log, Role::Customer, "Hi", false);
        feed(&mut log, Role::Customer, "Hi there", false);
        feed(&mut log, Role::Customer, "Hi there.", true);

        assert_eq!(log.len(), 1);
        assert_eq!(log.messages()[0].text, "Hi there.");
        assert!(log.messages()[0].is_final);
    }

    #[test]
    fn test_role_change_force_finalizes_tail() {
        let mut log = ChatLog::new();
        feed(&mut log, Role::Customer, "partial", false);
        feed(&mut log, Role::Agent, "ok", true);

        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::Customer);
        assert!(messages[0].is_final);
        assert_eq!(messages[1].role, Role::Agent);
        assert_eq!(messages[1].text, "ok");
    }

    #[test]
    fn test_same_role_after_final_starts_new_entry() {
        let mut log = ChatLog::new();
        feed(&mut log, Role::Agent, "Good day.", true);
        feed(&mut log, Role::Agent, "How may I help", false);

        assert_eq!(log.len(), 2);
        assert!(!log.messages()[1].is_final);
    }

    #[test]
    fn test_blank_text_is_discarded() {
        let mut log = ChatLog::new();
        feed(&mut log, Role::Customer, "", false);
        feed(&mut log, Role::Customer, "   \n\t", true);
        assert!(log.is_empty());

        feed(&mut log, Role::Customer, "Hello", false);
        feed(&mut log, Role::Agent, "  ", true);
        assert_eq!(log.len(), 1);
        assert!(!log.messages()[0].is_final);
    }
}
