pub mod audio;
pub mod coach;
pub mod config;
pub mod http;
pub mod live;
pub mod transcript;
pub mod trainer;

pub use audio::{
    AudioBackend, AudioBuffer, AudioFile, AudioFrame, AudioOutput, DeviceProvider,
    PlaybackScheduler, WavDevices,
};
pub use coach::{CallEvaluation, GeminiTextClient, SuggestionRequester, TextGenerator};
pub use config::Config;
pub use http::{create_router, AppState};
pub use live::{LiveSession, SessionEvent, WebSocketConnector};
pub use transcript::{ChatLog, TranscriptAccumulator, TranscriptLog};
pub use trainer::{BookingDraft, ScenarioOptions, Trainer};
