//! PCM wire codec
//!
//! The live endpoint speaks base64-encoded 16-bit little-endian PCM in both
//! directions. Outbound audio is captured as `f32` samples in [-1, 1] and
//! inbound audio is turned back into floating-point buffers for playback.

use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magnitude of the noise injected in place of exact-zero samples
pub const DITHER_AMPLITUDE: f32 = 0.0001;

/// Malformed base64 audio payload
#[derive(Debug, Error)]
#[error("Failed to decode audio payload: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// Encoded audio blob as sent to the live endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBlob {
    /// Base64-encoded PCM bytes
    pub data: String,
    /// Always `audio/pcm;rate=<sample_rate>`
    pub mime_type: String,
}

/// Decoded multi-channel audio ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// One vector of normalized samples per channel
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Number of sample frames per channel
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Playback duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Encode captured samples for the outbound stream.
pub fn encode_outbound(samples: &[f32], sample_rate: u32) -> WireBlob {
    encode_outbound_with(samples, sample_rate, &mut rand::thread_rng())
}

/// Same as [`encode_outbound`] with a caller-supplied dither source.
pub fn encode_outbound_with<R: Rng + ?Sized>(
    samples: &[f32],
    sample_rate: u32,
    rng: &mut R,
) -> WireBlob {
    let pcm_bytes: Vec<u8> = samples
        .iter()
        .map(|&s| sample_to_pcm(s, rng))
        .flat_map(|s| s.to_le_bytes())
        .collect();

    WireBlob {
        data: base64::engine::general_purpose::STANDARD.encode(&pcm_bytes),
        mime_type: format!("audio/pcm;rate={}", sample_rate),
    }
}

fn sample_to_pcm<R: Rng + ?Sized>(sample: f32, rng: &mut R) -> i16 {
    if sample == 0.0 {
        let dither = rng.gen_range(-DITHER_AMPLITUDE..=DITHER_AMPLITUDE);
        let pcm = scale(dither);
        // Dither below one quantization step still has to reach the wire
        if pcm == 0 {
            return if dither < 0.0 { -1 } else { 1 };
        }
        return pcm;
    }

    scale(sample)
}

fn scale(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Decode a base64 payload from the inbound stream.
pub fn decode_inbound(data: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
}

/// Reinterpret 16-bit little-endian PCM as a normalized multi-channel buffer.
///
/// A trailing odd byte or incomplete frame is ignored.
pub fn pcm_to_audio_buffer(bytes: &[u8], sample_rate: u32, channel_count: u16) -> AudioBuffer {
    let channel_count = channel_count.max(1) as usize;
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    let frame_count = samples.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];

    for frame in samples.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(sample as f32 / 32768.0);
        }
    }

    AudioBuffer {
        sample_rate,
        channels,
    }
}
