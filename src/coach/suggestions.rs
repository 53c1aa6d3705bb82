use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::prompts::{suggestion_prompt, suggestion_schema};
use super::{GenerationError, TextGenerator};

/// Suggestions kept from one response
pub const MAX_SUGGESTIONS: usize = 3;

/// Shown before the first call starts
pub const IDLE_SUGGESTION: &str = "Waiting for call to start...";

/// What a [`SuggestionRequester::request`] call did
#[derive(Debug, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// Another request was in flight; nothing was sent
    Skipped,
    /// Suggestions were replaced
    Updated(Vec<String>),
    /// Request failed; prior suggestions are untouched
    Failed(String),
}

/// Clears the in-flight flag however the request ends
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Asks the text model for the agent's next phrases
///
/// At most one request is in flight; triggers that arrive meanwhile are
/// dropped, not queued. Cloning shares the flag and the stored suggestions.
#[derive(Clone)]
pub struct SuggestionRequester {
    generator: Arc<dyn TextGenerator>,
    in_flight: Arc<AtomicBool>,
    suggestions: Arc<RwLock<Vec<String>>>,
}

impl SuggestionRequester {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            in_flight: Arc::new(AtomicBool::new(false)),
            suggestions: Arc::new(RwLock::new(vec![IDLE_SUGGESTION.to_string()])),
        }
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn suggestions(&self) -> Vec<String> {
        self.suggestions.read().await.clone()
    }

    /// Replace the suggestions directly (e.g. the opening greeting)
    pub async fn set(&self, suggestions: Vec<String>) {
        *self.suggestions.write().await = suggestions;
    }

    /// Request suggestions for `transcript` unless one is already running.
    pub async fn request(&self, transcript: &str) -> SuggestionOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Suggestion request already in flight, skipping");
            return SuggestionOutcome::Skipped;
        }
        let _guard = InFlight(Arc::clone(&self.in_flight));

        let result = self
            .generator
            .generate_json(&suggestion_prompt(transcript), &suggestion_schema())
            .await
            .and_then(|text| parse_suggestions(&text));

        match result {
            Ok(suggestions) => {
                info!("Received {} suggestions", suggestions.len());
                self.set(suggestions.clone()).await;
                SuggestionOutcome::Updated(suggestions)
            }
            Err(e) => {
                warn!("Suggestion request failed: {}", e);
                SuggestionOutcome::Failed(e.to_string())
            }
        }
    }

    /// Fire-and-forget [`request`](Self::request) on a new task.
    pub fn trigger(&self, transcript: String) {
        // Checked here too so a busy requester does not spawn at all
        if self.is_generating() {
            debug!("Suggestion request already in flight, skipping");
            return;
        }
        let requester = self.clone();
        tokio::spawn(async move {
            requester.request(&transcript).await;
        });
    }
}

fn parse_suggestions(text: &str) -> Result<Vec<String>, GenerationError> {
    let mut suggestions: Vec<String> = serde_json::from_str(text)?;
    if suggestions.is_empty() {
        return Err(GenerationError::Schema("empty suggestion list".to_string()));
    }
    suggestions.truncate(MAX_SUGGESTIONS);
    Ok(suggestions)
}
