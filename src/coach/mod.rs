//! Coaching requests against the hosted text model
//!
//! - [`SuggestionRequester`]: next-phrase suggestions for the agent, at most
//!   one request in flight
//! - [`EvaluationRequester`]: post-call scoring of a submitted booking
//!
//! Both go through the [`TextGenerator`] seam so tests can point them at a
//! mock server.

mod client;
mod evaluation;
mod prompts;
mod suggestions;

pub use client::{GeminiTextClient, DEFAULT_TEXT_MODEL, DEFAULT_TEXT_URL};
pub use evaluation::{BookingAccuracy, CallEvaluation, EvaluationRequester};
pub use suggestions::{SuggestionOutcome, SuggestionRequester, IDLE_SUGGESTION, MAX_SUGGESTIONS};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a structured text generation call
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Request never produced a response
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Endpoint answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response carried no text candidate
    #[error("Response contained no text")]
    EmptyResponse,

    /// Text was not the JSON we asked for
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// JSON parsed but violates the expected shape
    #[error("Unexpected response: {0}")]
    Schema(String),
}

/// Produces JSON text constrained by a response schema
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String, GenerationError>;
}
