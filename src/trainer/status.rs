use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::live::ConnectionState;

/// Snapshot of the current call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatus {
    /// Live session lifecycle
    pub connection: ConnectionState,

    /// Assigned when the stream opens
    pub call_id: Option<String>,

    pub started_at: Option<DateTime<Utc>>,

    /// Set when the call closes
    pub ended_at: Option<DateTime<Utc>>,

    /// Length of the call so far, or of the whole call once it ended
    pub duration_secs: Option<f64>,

    /// Voice of the simulated customer
    pub voice: Option<String>,

    /// Whether a call is in progress
    pub active: bool,

    /// Whether customer audio is playing right now
    pub customer_speaking: bool,

    /// Last connection-level error, cleared when a call opens
    pub status_message: Option<String>,

    /// Whether a suggestion request is in flight
    pub generating_suggestions: bool,

    /// A booking was submitted and will be evaluated at hang-up
    pub booking_submitted: bool,
}
