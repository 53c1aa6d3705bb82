// Test doubles shared by the session, trainer and HTTP tests.
//
// The connector hands the "server" end of every connection back to the test,
// and the devices record what the session did with them.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use reservation_trainer::audio::{
    AudioBackend, AudioBuffer, AudioFrame, AudioOutput, DeviceProvider, PlaybackHandle,
};
use reservation_trainer::coach::{GenerationError, TextGenerator};
use reservation_trainer::live::messages::{
    ModelTurn, Part, ServerContent, ServerMessage, Transcription,
};
use reservation_trainer::live::{
    ClientMessage, LiveConnection, LiveConnector, LiveError, SessionEvent, Setup,
};
use reservation_trainer::audio::WireBlob;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Connector
// ============================================================================

/// Server side of one fake connection
pub struct Remote {
    pub setup: Setup,
    pub from_client: mpsc::Receiver<ClientMessage>,
    pub to_client: mpsc::Sender<Result<ServerMessage, LiveError>>,
}

impl Remote {
    pub async fn send(&self, message: ServerMessage) {
        self.to_client.send(Ok(message)).await.unwrap();
    }

    pub async fn fail(&self, error: LiveError) {
        self.to_client.send(Err(error)).await.unwrap();
    }
}

pub struct FakeConnector {
    remotes: mpsc::UnboundedSender<Remote>,
    pub connects: AtomicUsize,
    pub refuse: AtomicBool,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Remote>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            remotes: tx,
            connects: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
        });
        (connector, rx)
    }
}

#[async_trait]
impl LiveConnector for FakeConnector {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, LiveError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(LiveError::ConnectionFailed("refused".to_string()));
        }

        let (outbound, from_client) = mpsc::channel(64);
        let (to_client, inbound) = mpsc::channel(64);
        let _ = self.remotes.send(Remote {
            setup,
            from_client,
            to_client,
        });

        Ok(LiveConnection { outbound, inbound })
    }
}

/// Holds every handshake until the test releases it
pub struct GatedConnector {
    inner: Arc<FakeConnector>,
    /// Signalled when a handshake has started
    pub entered: Notify,
    /// Lets the pending handshake finish
    pub release: Notify,
}

impl GatedConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Remote>) {
        let (inner, remotes) = FakeConnector::new();
        let connector = Arc::new(Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        });
        (connector, remotes)
    }
}

#[async_trait]
impl LiveConnector for GatedConnector {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, LiveError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.connect(setup).await
    }
}

// ============================================================================
// Devices
// ============================================================================

/// Counters and recordings shared between the devices and the test
#[derive(Default)]
pub struct DeviceLog {
    pub inputs_opened: AtomicUsize,
    pub inputs_stopped: AtomicUsize,
    pub outputs_closed: AtomicUsize,
    /// (handle, start_at, duration)
    pub played: Mutex<Vec<(PlaybackHandle, f64, f64)>>,
    pub stopped: Mutex<Vec<PlaybackHandle>>,
    pub clock: Mutex<f64>,
}

pub struct FakeDevices {
    pub log: Arc<DeviceLog>,
    /// Frames delivered as soon as capture starts
    pub frames: Vec<AudioFrame>,
    pub input_rate: u32,
    pub fail_input: AtomicBool,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Self::with_frames(Vec::new())
    }

    pub fn with_frames(frames: Vec<AudioFrame>) -> Arc<Self> {
        Arc::new(Self {
            log: Arc::new(DeviceLog::default()),
            frames,
            input_rate: 16000,
            fail_input: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl DeviceProvider for FakeDevices {
    async fn open_input(&self, _requested_rate: u32) -> Result<Box<dyn AudioBackend>> {
        if self.fail_input.load(Ordering::SeqCst) {
            bail!("Microphone permission denied");
        }
        self.log.inputs_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeInput {
            log: Arc::clone(&self.log),
            frames: self.frames.clone(),
            rate: self.input_rate,
            sender: None,
        }))
    }

    async fn open_output(&self, requested_rate: u32) -> Result<Box<dyn AudioOutput>> {
        Ok(Box::new(FakeOutput {
            log: Arc::clone(&self.log),
            rate: requested_rate,
        }))
    }
}

struct FakeInput {
    log: Arc<DeviceLog>,
    frames: Vec<AudioFrame>,
    rate: u32,
    /// Held so capture stays open until stopped
    sender: Option<mpsc::Sender<AudioFrame>>,
}

#[async_trait]
impl AudioBackend for FakeInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in self.frames.drain(..) {
            tx.try_send(frame)?;
        }
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.sender = None;
        self.log.inputs_stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "fake-mic"
    }

    fn sample_rate(&self) -> u32 {
        self.rate
    }
}

struct FakeOutput {
    log: Arc<DeviceLog>,
    rate: u32,
}

impl AudioOutput for FakeOutput {
    fn sample_rate(&self) -> u32 {
        self.rate
    }

    fn current_time(&self) -> f64 {
        *self.log.clock.lock().unwrap()
    }

    fn play(&mut self, handle: PlaybackHandle, buffer: &AudioBuffer, start_at: f64) -> Result<()> {
        self.log
            .played
            .lock()
            .unwrap()
            .push((handle, start_at, buffer.duration_secs()));
        Ok(())
    }

    fn stop(&mut self, handle: PlaybackHandle) {
        self.log.stopped.lock().unwrap().push(handle);
    }

    fn close(&mut self) -> Result<()> {
        self.log.outputs_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Text generation
// ============================================================================

/// Replies with canned JSON depending on which prompt it sees
pub struct CannedGenerator {
    pub suggestions: String,
    pub evaluation: String,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl CannedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            suggestions: r#"["Could I have your check-in date?", "How many guests?", "Any view preference?"]"#.to_string(),
            evaluation: r#"{"score": 90, "summary": "Well handled.", "strengths": ["Polite"], "areasForImprovement": ["Upsell breakfast"], "bookingAccuracy": "Perfect"}"#.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate_json(
        &self,
        prompt: &str,
        _schema: &serde_json::Value,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.contains("Quality Assurance") {
            Ok(self.evaluation.clone())
        } else {
            Ok(self.suggestions.clone())
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Skip events until one matches
pub async fn wait_for<F>(events: &mut mpsc::UnboundedReceiver<SessionEvent>, mut matches: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    loop {
        let event = next_event(events).await;
        if matches(&event) {
            return event;
        }
    }
}

/// Poll `check` until it holds or the wait runs out
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub fn output_transcription(text: &str) -> ServerMessage {
    content(ServerContent {
        output_transcription: Some(Transcription {
            text: text.to_string(),
        }),
        ..Default::default()
    })
}

pub fn input_transcription(text: &str) -> ServerMessage {
    content(ServerContent {
        input_transcription: Some(Transcription {
            text: text.to_string(),
        }),
        ..Default::default()
    })
}

pub fn turn_complete() -> ServerMessage {
    content(ServerContent {
        turn_complete: true,
        ..Default::default()
    })
}

pub fn interrupted() -> ServerMessage {
    content(ServerContent {
        interrupted: true,
        ..Default::default()
    })
}

/// Model audio carrying `samples` zero-valued 16-bit samples at 24kHz
pub fn model_audio(samples: usize) -> ServerMessage {
    use base64::Engine;
    model_audio_raw(&base64::engine::general_purpose::STANDARD.encode(vec![0u8; samples * 2]))
}

pub fn model_audio_raw(data: &str) -> ServerMessage {
    content(ServerContent {
        model_turn: Some(ModelTurn {
            parts: vec![Part {
                inline_data: Some(WireBlob {
                    data: data.to_string(),
                    mime_type: "audio/pcm;rate=24000".to_string(),
                }),
                text: None,
            }],
        }),
        ..Default::default()
    })
}

fn content(content: ServerContent) -> ServerMessage {
    ServerMessage {
        server_content: Some(content),
        ..Default::default()
    }
}
