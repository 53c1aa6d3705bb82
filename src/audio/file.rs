use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use hound::{SampleFormat, WavReader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioFrame, AudioOutput, DeviceProvider, PlaybackHandle};
use super::codec::AudioBuffer;

/// A WAV file loaded as mono `f32` samples (first channel only)
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                if spec.bits_per_sample != 16 {
                    bail!(
                        "Unsupported WAV sample width: {} bits (expected 16)",
                        spec.bits_per_sample
                    );
                }
                reader
                    .into_samples::<i16>()
                    .map(|s| s.map(|s| s as f32 / 32768.0))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        // The capture path only ever reads the first channel
        let samples: Vec<f32> = interleaved
            .iter()
            .step_by(spec.channels.max(1) as usize)
            .copied()
            .collect();

        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels",
            duration_seconds, spec.sample_rate, spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Replays a WAV file as if it were live microphone input
///
/// Frames are emitted at real-time pace so the remote endpoint sees the
/// same cadence a sound card would produce.
pub struct WavFileBackend {
    file: Arc<AudioFile>,
    frame_size: usize,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavFileBackend {
    pub fn new(file: AudioFile, frame_size: usize) -> Self {
        Self {
            file: Arc::new(file),
            frame_size: frame_size.max(1),
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn open(path: impl AsRef<Path>, frame_size: usize) -> Result<Self> {
        Ok(Self::new(AudioFile::open(path)?, frame_size))
    }
}

#[async_trait]
impl AudioBackend for WavFileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(32);
        let file = Arc::clone(&self.file);
        let frame_size = self.frame_size;
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let frame_period =
            Duration::from_secs_f64(frame_size as f64 / file.sample_rate.max(1) as f64);

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_period);
            for (index, chunk) in file.samples.chunks(frame_size).enumerate() {
                ticker.tick().await;
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: file.sample_rate,
                    timestamp_ms: (index * frame_size) as u64 * 1000 / file.sample_rate.max(1) as u64,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }

            capturing.store(false, Ordering::SeqCst);
            info!("WAV replay finished: {}", file.path);
        }));

        info!(
            "WAV capture started: {} ({}Hz, {} samples per frame)",
            self.file.path, self.file.sample_rate, self.frame_size
        );

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }

    fn sample_rate(&self) -> u32 {
        self.file.sample_rate
    }
}

/// Renders scheduled buffers onto a wall-clock timeline and writes the
/// result as a 16-bit mono WAV when closed
pub struct WavFileOutput {
    path: PathBuf,
    sample_rate: u32,
    started: Instant,
    timeline: Vec<f32>,
    /// Where each buffer was mixed in, so a stop can take it back out
    placed: HashMap<PlaybackHandle, (usize, Vec<f32>)>,
    closed: bool,
}

impl WavFileOutput {
    pub fn new(path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            started: Instant::now(),
            timeline: Vec::new(),
            placed: HashMap::new(),
            closed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seconds_to_index(&self, secs: f64) -> usize {
        (secs.max(0.0) * self.sample_rate as f64).round() as usize
    }
}

impl AudioOutput for WavFileOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn play(&mut self, handle: PlaybackHandle, buffer: &AudioBuffer, start_at: f64) -> Result<()> {
        if self.closed {
            bail!("Audio output already closed");
        }

        let samples = buffer.channels.first().cloned().unwrap_or_default();
        let offset = self.seconds_to_index(start_at);
        let end = offset + samples.len();
        if self.timeline.len() < end {
            self.timeline.resize(end, 0.0);
        }
        for (slot, sample) in self.timeline[offset..end].iter_mut().zip(&samples) {
            *slot += sample;
        }

        self.placed.insert(handle, (offset, samples));
        Ok(())
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        let Some((offset, samples)) = self.placed.remove(&handle) else {
            return;
        };

        // Silence whatever part of the buffer has not been heard yet
        let now = self.seconds_to_index(self.current_time());
        let skip = now.saturating_sub(offset).min(samples.len());
        let from = offset + skip;
        for (slot, sample) in self.timeline[from..offset + samples.len()]
            .iter_mut()
            .zip(&samples[skip..])
        {
            *slot -= sample;
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.placed.clear();

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&self.path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", self.path))?;
        for &sample in &self.timeline {
            let s = sample.clamp(-1.0, 1.0);
            let pcm = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
            writer
                .write_sample(pcm as i16)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV file")?;

        info!(
            "Customer audio written: {:?} ({:.1}s)",
            self.path,
            self.timeline.len() as f64 / self.sample_rate as f64
        );
        Ok(())
    }
}

impl Drop for WavFileOutput {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to finalize WAV output on drop: {}", e);
        }
    }
}

/// Devices backed by WAV files: replayed agent input, recorded customer output
pub struct WavDevices {
    input: PathBuf,
    output_dir: PathBuf,
    frame_size: usize,
}

impl WavDevices {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, frame_size: usize) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            frame_size,
        }
    }
}

#[async_trait]
impl DeviceProvider for WavDevices {
    async fn open_input(&self, requested_rate: u32) -> Result<Box<dyn AudioBackend>> {
        let backend = WavFileBackend::open(&self.input, self.frame_size)?;
        if backend.sample_rate() != requested_rate {
            info!(
                "Input realized at {}Hz (requested {}Hz)",
                backend.sample_rate(),
                requested_rate
            );
        }
        Ok(Box::new(backend))
    }

    async fn open_output(&self, requested_rate: u32) -> Result<Box<dyn AudioOutput>> {
        std::fs::create_dir_all(&self.output_dir)
            .context("Failed to create output directory")?;
        let path = self.output_dir.join(format!(
            "customer-{}.wav",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));
        Ok(Box::new(WavFileOutput::new(path, requested_rate)))
    }
}
