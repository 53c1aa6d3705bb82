use serde::{Deserialize, Serialize};

/// Default live endpoint (bidirectional generate-content stream)
pub const DEFAULT_LIVE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default native-audio model
pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Settings for the live streaming connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// WebSocket endpoint
    pub url: String,

    /// API key, sent as the `key` query parameter
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Requested microphone rate (the device may realize a different one)
    pub input_sample_rate: u32,

    /// Requested output context rate
    pub output_sample_rate: u32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LIVE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_LIVE_MODEL.to_string(),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
        }
    }
}

/// Per-call voice and persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Prebuilt voice (e.g. "Puck")
    pub voice_name: String,

    /// Persona and behaviour of the simulated customer
    pub system_instruction: String,
}
