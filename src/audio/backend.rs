use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::codec::AudioBuffer;

/// Captured microphone samples (mono, normalized to [-1, 1])
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Captured samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Identifies one scheduled buffer on an [`AudioOutput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackHandle(pub u64);

/// Audio capture backend trait
///
/// Implementations:
/// - WAV file replay (for training runs without a sound card and for tests)
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive fixed-size frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;

    /// Realized capture rate, which may differ from the requested one
    fn sample_rate(&self) -> u32;
}

/// Audio rendering context with a sample-accurate clock
pub trait AudioOutput: Send {
    /// Realized output rate
    fn sample_rate(&self) -> u32;

    /// Current position of the output clock in seconds
    fn current_time(&self) -> f64;

    /// Start playing `buffer` at `start_at` seconds on the output clock
    fn play(&mut self, handle: PlaybackHandle, buffer: &AudioBuffer, start_at: f64) -> Result<()>;

    /// Stop a scheduled buffer immediately; unknown handles are ignored
    fn stop(&mut self, handle: PlaybackHandle);

    /// Release the context
    fn close(&mut self) -> Result<()>;
}

/// Host capability that hands out capture and playback devices
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Acquire the microphone, asking for `requested_rate`
    async fn open_input(&self, requested_rate: u32) -> Result<Box<dyn AudioBackend>>;

    /// Acquire an output context, asking for `requested_rate`
    async fn open_output(&self, requested_rate: u32) -> Result<Box<dyn AudioOutput>>;
}
