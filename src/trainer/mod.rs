//! Training desk around a live call
//!
//! This module provides the `Trainer` controller that manages:
//! - Scenario selection (persona toggles and voice)
//! - Chat log and plain transcript from session events
//! - Agent suggestions after each customer line
//! - The booking draft and the post-call evaluation

mod booking;
mod controller;
mod scenario;
mod status;

pub use booking::BookingDraft;
pub use controller::Trainer;
pub use scenario::{
    ScenarioOptions, VoicePreset, GREETING, IRATE_INSTRUCTION, SYSTEM_INSTRUCTION,
    TAGALOG_INSTRUCTION, VOICE_PRESETS,
};
pub use status::CallStatus;

use thiserror::Error;

use crate::live::LiveError;

/// Errors surfaced to the trainee's controls
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("A call is already in progress")]
    CallInProgress,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Select a room before submitting the booking")]
    NoRoomSelected,

    #[error(transparent)]
    Live(#[from] LiveError),
}
