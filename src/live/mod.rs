//! Live voice session with the simulated customer
//!
//! This module provides:
//! - the wire protocol of the hosted live-audio endpoint (`messages`)
//! - a WebSocket transport behind the [`LiveConnector`] seam (`transport`)
//! - the [`LiveSession`] coordinator that wires capture, playback and
//!   transcription together (`session`)

mod config;
pub mod messages;
mod session;
mod transport;

pub use config::{ConnectOptions, LiveConfig};
pub use messages::{ClientMessage, ServerContent, ServerMessage, Setup};
pub use session::LiveSession;
pub use transport::{LiveConnection, LiveConnector, WebSocketConnector};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::DecodeError;
use crate::transcript::TranscriptUpdate;

/// Sample rate of model audio on the inbound stream
pub const LIVE_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Errors that can occur during a live session.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Microphone or output device could not be acquired
    #[error("Audio device unavailable: {0}")]
    Device(String),

    /// Handshake with the live endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Transport failure after the stream was established
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Inbound audio payload was not valid base64
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Decoded audio could not be scheduled
    #[error("Playback error: {0}")]
    Playback(String),
}

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Notifications from a [`LiveSession`], delivered in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Stream established, audio is flowing
    Open,
    /// Session ended and every device was released
    Close,
    /// Connection-level failure worth showing to the trainee
    Error(String),
    /// Customer audio started or stopped
    Speaking(bool),
    Transcript(TranscriptUpdate),
}
