//! Transcript handling
//!
//! Incremental speech-to-text deltas become:
//! - [`TranscriptUpdate`] events from the [`TranscriptAccumulator`]
//! - streaming chat bubbles in the [`ChatLog`]
//! - finalized `"<Role>: <text>"` lines in the [`TranscriptLog`]

mod accumulator;
mod chat;
mod log;

pub use accumulator::TranscriptAccumulator;
pub use chat::{ChatLog, ChatMessage};
pub use log::TranscriptLog;

use serde::{Deserialize, Serialize};

/// Who is speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The trainee (microphone / input transcription)
    Agent,
    /// The simulated caller (model audio / output transcription)
    Customer,
}

impl Role {
    /// Prefix used in the plain-text transcript
    pub fn prefix(self) -> &'static str {
        match self {
            Role::Agent => "Agent",
            Role::Customer => "Customer",
        }
    }
}

/// Full text so far for one speaker's current turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptUpdate {
    pub role: Role,
    pub text: String,
    pub is_final: bool,
}

impl TranscriptUpdate {
    pub fn new(role: Role, text: impl Into<String>, is_final: bool) -> Self {
        Self {
            role,
            text: text.into(),
            is_final,
        }
    }
}
