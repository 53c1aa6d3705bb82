pub mod backend;
pub mod codec;
pub mod file;
pub mod playback;

pub use backend::{AudioBackend, AudioFrame, AudioOutput, DeviceProvider, PlaybackHandle};
pub use codec::{
    decode_inbound, encode_outbound, encode_outbound_with, pcm_to_audio_buffer, AudioBuffer,
    DecodeError, WireBlob, DITHER_AMPLITUDE,
};
pub use file::{AudioFile, WavDevices, WavFileBackend, WavFileOutput};
pub use playback::{PlaybackScheduler, ScheduledPlayback, SpeakingCallback};
