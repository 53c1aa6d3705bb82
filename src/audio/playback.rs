//! Gapless playback scheduling
//!
//! Inbound audio arrives in bursts of short buffers. Each buffer starts
//! where the previous one ends, or immediately when the queue has drained,
//! so playback never lands in the past and never overlaps.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{debug, warn};

use super::backend::{AudioOutput, PlaybackHandle};
use super::codec::AudioBuffer;

/// Receives the "customer is audibly speaking" signal
pub type SpeakingCallback = Box<dyn FnMut(bool) + Send>;

/// Where a buffer landed on the output clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledPlayback {
    pub handle: PlaybackHandle,
    pub start_at: f64,
    pub end_at: f64,
}

pub struct PlaybackScheduler {
    output: Box<dyn AudioOutput>,
    next_start_time: f64,
    /// Active buffers and their end time on the output clock
    active: BTreeMap<PlaybackHandle, f64>,
    next_handle: u64,
    on_speaking: SpeakingCallback,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn AudioOutput>, on_speaking: SpeakingCallback) -> Self {
        Self {
            output,
            next_start_time: 0.0,
            active: BTreeMap::new(),
            next_handle: 0,
            on_speaking,
        }
    }

    /// Schedule a buffer right after everything already queued.
    pub fn schedule(&mut self, buffer: &AudioBuffer) -> Result<ScheduledPlayback> {
        let start_at = self.output.current_time().max(self.next_start_time);
        let handle = PlaybackHandle(self.next_handle);
        self.next_handle += 1;

        self.output.play(handle, buffer, start_at)?;

        let end_at = start_at + buffer.duration_secs();
        self.next_start_time = end_at;
        self.active.insert(handle, end_at);

        debug!(
            "Scheduled playback {:?}: {:.3}s - {:.3}s ({} active)",
            handle,
            start_at,
            end_at,
            self.active.len()
        );

        (self.on_speaking)(true);

        Ok(ScheduledPlayback {
            handle,
            start_at,
            end_at,
        })
    }

    /// Mark a buffer as finished playing.
    pub fn finish(&mut self, handle: PlaybackHandle) {
        if self.active.remove(&handle).is_some() && self.active.is_empty() {
            (self.on_speaking)(false);
        }
    }

    /// Finish every buffer whose end time has passed on the output clock.
    pub fn reap(&mut self) {
        let now = self.output.current_time();
        let ended: Vec<PlaybackHandle> = self
            .active
            .iter()
            .filter(|&(_, &end_at)| end_at <= now)
            .map(|(&handle, _)| handle)
            .collect();

        for handle in ended {
            self.finish(handle);
        }
    }

    /// Stop and discard everything, resetting the cursor.
    pub fn interrupt(&mut self) {
        let stopped = self.active.len();
        for handle in std::mem::take(&mut self.active).into_keys() {
            self.output.stop(handle);
        }
        self.next_start_time = 0.0;

        debug!("Playback interrupted ({} buffers stopped)", stopped);
        (self.on_speaking)(false);
    }

    /// Stop playback and release the output context.
    pub fn close(&mut self) {
        for handle in std::mem::take(&mut self.active).into_keys() {
            self.output.stop(handle);
        }
        self.next_start_time = 0.0;

        if let Err(e) = self.output.close() {
            warn!("Failed to close audio output: {}", e);
        }
    }

    pub fn is_speaking(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }
}
