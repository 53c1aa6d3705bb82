use super::{Role, TranscriptUpdate};

/// Per-speaker text buffers for the turn in progress
///
/// A speaker's pending text is finalized only when the remote side signals
/// turn-complete or the customer is interrupted. The other speaker talking
/// in between does not split the turn.
#[derive(Debug, Default)]
pub struct TranscriptAccumulator {
    agent: String,
    customer: String,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.agent.clear();
        self.customer.clear();
    }

    /// Append a delta for `role` and report the buffer's full text.
    pub fn push(&mut self, role: Role, delta: &str) -> Vec<TranscriptUpdate> {
        if delta.is_empty() {
            return Vec::new();
        }

        let buffer = self.buffer_mut(role);
        buffer.push_str(delta);
        vec![TranscriptUpdate::new(role, buffer.clone(), false)]
    }

    /// Finalize whatever is pending and start a fresh turn.
    pub fn complete_turn(&mut self) -> Vec<TranscriptUpdate> {
        [Role::Customer, Role::Agent]
            .into_iter()
            .filter_map(|role| {
                let text = std::mem::take(self.buffer_mut(role));
                (!text.is_empty()).then(|| TranscriptUpdate::new(role, text, true))
            })
            .collect()
    }

    /// The customer was cut off: emit what they said so far as final.
    pub fn interrupt(&mut self) -> Option<TranscriptUpdate> {
        let text = std::mem::take(&mut self.customer);
        (!text.is_empty()).then(|| TranscriptUpdate::new(Role::Customer, text, true))
    }

    pub fn pending(&self, role: Role) -> &str {
        match role {
            Role::Agent => &self.agent,
            Role::Customer => &self.customer,
        }
    }

    fn buffer_mut(&mut self, role: Role) -> &mut String {
        match role {
            Role::Agent => &mut self.agent,
            Role::Customer => &mut self.customer,
        }
    }
}
