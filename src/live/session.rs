use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::{ConnectOptions, LiveConfig};
use super::messages::{ClientMessage, ServerMessage, Setup};
use super::transport::{LiveConnection, LiveConnector};
use super::{ConnectionState, LiveError, SessionEvent, LIVE_OUTPUT_SAMPLE_RATE};
use crate::audio::{
    decode_inbound, encode_outbound, pcm_to_audio_buffer, AudioBackend, AudioFrame, AudioOutput,
    DeviceProvider, PlaybackScheduler,
};
use crate::transcript::{Role, TranscriptAccumulator};

/// How often finished playback buffers are reaped.
const REAP_INTERVAL: Duration = Duration::from_millis(20);

/// Connection state plus a generation counter; every disconnect bumps the
/// generation so work started for an older session can tell it is stale
#[derive(Debug)]
struct Lifecycle {
    state: ConnectionState,
    generation: u64,
}

struct Shared {
    lifecycle: Mutex<Lifecycle>,
    task: tokio::sync::Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Shared {
    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lifecycle().generation == generation
    }

    fn is_open(&self, generation: u64) -> bool {
        let lifecycle = self.lifecycle();
        lifecycle.generation == generation && lifecycle.state == ConnectionState::Open
    }

    /// Move to `Closed`. Returns `true` if a live session was actually closed.
    fn close(&self, generation: Option<u64>) -> bool {
        let mut lifecycle = self.lifecycle();
        if generation.is_some_and(|g| g != lifecycle.generation) {
            return false;
        }
        let was_live = matches!(
            lifecycle.state,
            ConnectionState::Connecting | ConnectionState::Open
        );
        lifecycle.state = ConnectionState::Closed;
        lifecycle.generation += 1;
        was_live
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is not an error
        let _ = self.events.send(event);
    }
}

/// Coordinates one live call at a time
///
/// Owns the connection lifecycle (`Idle → Connecting → Open → Closed`),
/// routes inbound messages to playback and transcription, and streams
/// microphone frames outbound. The session is reusable: after a disconnect
/// completes, `connect` starts a fresh call.
pub struct LiveSession {
    config: LiveConfig,
    connector: Arc<dyn LiveConnector>,
    devices: Arc<dyn DeviceProvider>,
    shared: Arc<Shared>,
}

impl LiveSession {
    /// Create a session; events are delivered on the returned receiver.
    pub fn new(
        config: LiveConfig,
        connector: Arc<dyn LiveConnector>,
        devices: Arc<dyn DeviceProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            config,
            connector,
            devices,
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle {
                    state: ConnectionState::Idle,
                    generation: 0,
                }),
                task: tokio::sync::Mutex::new(None),
                events,
            }),
        };
        (session, rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lifecycle().state
    }

    /// Start a call. No-op while a call is connecting or open.
    ///
    /// Device and handshake failures are reported both as an `Error` event
    /// and as the returned error; the session is left `Closed`.
    pub async fn connect(&self, options: ConnectOptions) -> Result<(), LiveError> {
        let generation = {
            let mut lifecycle = self.shared.lifecycle();
            if matches!(
                lifecycle.state,
                ConnectionState::Connecting | ConnectionState::Open
            ) {
                debug!("Session already {:?}, ignoring connect", lifecycle.state);
                return Ok(());
            }
            lifecycle.state = ConnectionState::Connecting;
            lifecycle.generation += 1;
            lifecycle.generation
        };

        info!("Connecting live session (voice {})", options.voice_name);

        match self.open(generation, options).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Live session failed to start: {}", e);
                if self.shared.is_current(generation) {
                    self.shared.close(Some(generation));
                    self.shared.emit(SessionEvent::Error(e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn open(&self, generation: u64, options: ConnectOptions) -> Result<(), LiveError> {
        let mut input = self
            .devices
            .open_input(self.config.input_sample_rate)
            .await
            .map_err(|e| LiveError::Device(format!("{:#}", e)))?;

        let output = match self.devices.open_output(self.config.output_sample_rate).await {
            Ok(output) => output,
            Err(e) => {
                release_input(input.as_mut()).await;
                return Err(LiveError::Device(format!("{:#}", e)));
            }
        };

        if !self.shared.is_current(generation) {
            info!("Disconnected while acquiring devices");
            release_devices(input.as_mut(), output).await;
            return Ok(());
        }

        let setup = Setup::audio(
            &self.config.model,
            &options.voice_name,
            &options.system_instruction,
        );
        let connection = match self.connector.connect(setup).await {
            Ok(connection) => connection,
            Err(e) => {
                release_devices(input.as_mut(), output).await;
                return Err(e);
            }
        };

        let mut frames = match input.start().await {
            Ok(frames) => frames,
            Err(e) => {
                release_devices(input.as_mut(), output).await;
                return Err(LiveError::Device(format!("{:#}", e)));
            }
        };

        let mut task_slot = self.shared.task.lock().await;

        let opened = {
            let mut lifecycle = self.shared.lifecycle();
            let current = lifecycle.generation == generation;
            if current {
                lifecycle.state = ConnectionState::Open;
            }
            current
        };

        if !opened {
            info!("Disconnected during handshake");
            frames.close();
            release_devices(input.as_mut(), output).await;
            return Ok(());
        }

        self.shared.emit(SessionEvent::Open);

        info!(
            "Live session open: capturing from {} at {}Hz",
            input.name(),
            input.sample_rate()
        );

        let events = self.shared.events.clone();
        let scheduler = PlaybackScheduler::new(
            output,
            Box::new(move |speaking| {
                let _ = events.send(SessionEvent::Speaking(speaking));
            }),
        );

        let task = SessionTask {
            generation,
            shared: Arc::clone(&self.shared),
            input,
            frames,
            connection,
            scheduler,
            accumulator: TranscriptAccumulator::new(),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(task.run(shutdown_rx));
        *task_slot = Some((shutdown_tx, handle));

        Ok(())
    }

    /// End the call. Idempotent and safe to call while connecting.
    ///
    /// Returns once capture, playback and the stream have been released.
    pub async fn disconnect(&self) {
        let was_live = self.shared.close(None);

        let task = self.shared.task.lock().await.take();
        if let Some((shutdown, handle)) = task {
            let _ = shutdown.send(());
            if let Err(e) = handle.await {
                error!("Session task panicked: {}", e);
            }
        }

        if was_live {
            info!("Live session disconnected");
            self.shared.emit(SessionEvent::Close);
        }
    }
}

async fn release_input(input: &mut dyn AudioBackend) {
    if let Err(e) = input.stop().await {
        warn!("Failed to stop audio capture: {}", e);
    }
}

async fn release_devices(input: &mut dyn AudioBackend, mut output: Box<dyn AudioOutput>) {
    release_input(input).await;
    if let Err(e) = output.close() {
        warn!("Failed to close audio output: {}", e);
    }
}

enum Exit {
    Shutdown,
    RemoteClosed,
    Failed(LiveError),
}

/// Everything one open call owns; lives on its own task
struct SessionTask {
    generation: u64,
    shared: Arc<Shared>,
    input: Box<dyn AudioBackend>,
    frames: mpsc::Receiver<AudioFrame>,
    connection: LiveConnection,
    scheduler: PlaybackScheduler,
    accumulator: TranscriptAccumulator,
}

impl SessionTask {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        self.accumulator.reset();

        let mut reap = tokio::time::interval(REAP_INTERVAL);
        let mut capturing = true;

        let exit = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break Exit::Shutdown,

                inbound = self.connection.inbound.recv() => match inbound {
                    Some(Ok(message)) => {
                        if let Err(e) = self.handle_message(message) {
                            warn!("Dropped inbound message: {}", e);
                        }
                    }
                    Some(Err(e)) => break Exit::Failed(e),
                    None => break Exit::RemoteClosed,
                },

                frame = self.frames.recv(), if capturing => match frame {
                    Some(frame) => self.forward(frame),
                    None => {
                        info!("Audio capture ended");
                        capturing = false;
                    }
                },

                _ = reap.tick() => self.scheduler.reap(),
            }
        };

        let closed_here = match exit {
            Exit::Shutdown => false,
            Exit::RemoteClosed => {
                info!("Live stream closed by remote");
                self.shared.close(Some(self.generation))
            }
            Exit::Failed(e) => {
                if self.shared.is_open(self.generation) {
                    error!("Live session error: {}", e);
                    self.shared.emit(SessionEvent::Error(e.to_string()));
                } else {
                    debug!("Ignoring late error after close: {}", e);
                }
                self.shared.close(Some(self.generation))
            }
        };

        release_input(self.input.as_mut()).await;
        self.scheduler.close();
        drop(self.connection);

        if closed_here {
            self.shared.emit(SessionEvent::Close);
        }
    }

    /// Encode and send one captured frame.
    ///
    /// Never waits on the stream: a frame that does not fit is dropped so
    /// shutdown and inbound messages are always serviced.
    fn forward(&mut self, frame: AudioFrame) {
        if !self.shared.is_open(self.generation) {
            return;
        }

        let blob = encode_outbound(&frame.samples, frame.sample_rate);
        match self.connection.outbound.try_send(ClientMessage::audio(blob)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Outbound stream busy, dropped audio frame");
            }
            Err(TrySendError::Closed(_)) => {
                // Expected while tearing down
                if self.shared.is_open(self.generation) {
                    warn!("Failed to send audio frame: stream closed");
                }
            }
        }
    }

    fn handle_message(&mut self, message: ServerMessage) -> Result<(), LiveError> {
        if message.setup_complete.is_some() {
            debug!("Live setup complete");
        }
        if let Some(go_away) = &message.go_away {
            info!("Server is closing the stream soon: {:?}", go_away.time_left);
        }

        let Some(content) = message.server_content else {
            return Ok(());
        };

        if let Some(data) = content.audio_data() {
            let bytes = decode_inbound(data)?;
            let buffer = pcm_to_audio_buffer(&bytes, LIVE_OUTPUT_SAMPLE_RATE, 1);
            if buffer.frame_count() > 0 {
                self.scheduler
                    .schedule(&buffer)
                    .map_err(|e| LiveError::Playback(format!("{:#}", e)))?;
            }
        }

        if content.interrupted {
            debug!("Customer interrupted");
            self.scheduler.interrupt();
            if let Some(update) = self.accumulator.interrupt() {
                self.shared.emit(SessionEvent::Transcript(update));
            }
        }

        let mut updates = Vec::new();
        if let Some(t) = &content.output_transcription {
            updates.extend(self.accumulator.push(Role::Customer, &t.text));
        }
        if let Some(t) = &content.input_transcription {
            updates.extend(self.accumulator.push(Role::Agent, &t.text));
        }
        if content.turn_complete {
            updates.extend(self.accumulator.complete_turn());
        }

        for update in updates {
            self.shared.emit(SessionEvent::Transcript(update));
        }

        Ok(())
    }
}
