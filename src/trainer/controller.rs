use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::booking::BookingDraft;
use super::scenario::{ScenarioOptions, GREETING};
use super::status::CallStatus;
use super::TrainerError;
use crate::audio::DeviceProvider;
use crate::coach::{CallEvaluation, EvaluationRequester, SuggestionRequester, TextGenerator};
use crate::live::{ConnectOptions, ConnectionState, LiveConfig, LiveConnector, LiveSession, SessionEvent};
use crate::transcript::{ChatLog, ChatMessage, Role, TranscriptLog};

/// Everything the event pump and the API both touch
#[derive(Debug, Default)]
struct CallState {
    call_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    voice: Option<String>,
    active: bool,
    customer_speaking: bool,
    status_message: Option<String>,
    chat: ChatLog,
    transcript: TranscriptLog,
    booking: BookingDraft,
    booking_submitted: bool,
}

/// One trainee's desk: the live call plus the coaching around it
///
/// Session events are applied on a background task in delivery order; the
/// accessors return snapshots.
pub struct Trainer {
    session: LiveSession,
    state: Arc<Mutex<CallState>>,
    suggestions: SuggestionRequester,
    evaluator: EvaluationRequester,
    event_task: JoinHandle<()>,
    settle: mpsc::UnboundedSender<oneshot::Sender<()>>,
    evaluation_task: Mutex<Option<JoinHandle<()>>>,
}

impl Trainer {
    /// Build a trainer and start its event pump. Must run inside a runtime.
    pub fn new(
        config: LiveConfig,
        connector: Arc<dyn LiveConnector>,
        devices: Arc<dyn DeviceProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let (session, events) = LiveSession::new(config, connector, devices);
        let state = Arc::new(Mutex::new(CallState::default()));
        let suggestions = SuggestionRequester::new(Arc::clone(&generator));
        let evaluator = EvaluationRequester::new(generator);

        let (settle, settle_rx) = mpsc::unbounded_channel();
        let event_task = tokio::spawn(pump_events(
            events,
            settle_rx,
            Arc::clone(&state),
            suggestions.clone(),
            evaluator.clone(),
        ));

        Self {
            session,
            state,
            suggestions,
            evaluator,
            event_task,
            settle,
            evaluation_task: Mutex::new(None),
        }
    }

    /// Dial a simulated customer. Returns the voice that was used.
    pub async fn start_call(&self, options: ScenarioOptions) -> Result<String, TrainerError> {
        if matches!(
            self.session.state(),
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return Err(TrainerError::CallInProgress);
        }

        let voice = {
            let mut rng = rand::thread_rng();
            options.voice(&mut rng)
        }
        .ok_or_else(|| TrainerError::UnknownVoice(options.voice.clone().unwrap_or_default()))?;

        info!(
            "Starting call with voice {}, tagalog: {}, irate: {}",
            voice, options.tagalog, options.irate
        );

        {
            let mut state = self.state.lock().await;
            state.voice = Some(voice.to_string());
            // Bookings belong to the call being started
            state.booking_submitted = false;
        }

        self.session
            .connect(ConnectOptions {
                voice_name: voice.to_string(),
                system_instruction: options.instruction(),
            })
            .await?;

        Ok(voice.to_string())
    }

    /// Hang up. Kicks off the evaluation if a booking was submitted.
    pub async fn end_call(&self) {
        self.session.disconnect().await;
        self.settle_events().await;

        let pending = {
            let mut state = self.state.lock().await;
            if state.booking_submitted {
                // One evaluation per submitted booking
                state.booking_submitted = false;
                Some((state.transcript.render(), state.booking.clone()))
            } else {
                None
            }
        };

        if let Some((transcript, booking)) = pending {
            info!("Requesting call evaluation");
            let handle = self.evaluator.trigger(transcript, booking);
            *self.evaluation_task.lock().await = Some(handle);
        }
    }

    /// Wait until every session event delivered so far has been applied.
    async fn settle_events(&self) {
        let (ack, done) = oneshot::channel();
        if self.settle.send(ack).is_err() {
            warn!("Event pump is gone, transcript may be incomplete");
            return;
        }
        let _ = done.await;
    }

    /// Wait for a running evaluation, if any, to finish.
    pub async fn evaluation_settled(&self) -> Option<CallEvaluation> {
        let handle = self.evaluation_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Evaluation task panicked: {}", e);
            }
        }
        self.evaluator.evaluation().await
    }

    pub async fn update_booking(&self, draft: BookingDraft) {
        self.state.lock().await.booking = draft;
    }

    pub async fn booking(&self) -> BookingDraft {
        self.state.lock().await.booking.clone()
    }

    /// Confirm the current draft. It stays in place for the evaluator.
    pub async fn submit_booking(&self) -> Result<BookingDraft, TrainerError> {
        let mut state = self.state.lock().await;
        if !state.booking.has_room() {
            return Err(TrainerError::NoRoomSelected);
        }
        state.booking_submitted = true;
        info!(
            "Reservation confirmed for {} (room {})",
            state.booking.guest_name,
            state.booking.room_id.as_deref().unwrap_or_default()
        );
        Ok(state.booking.clone())
    }

    /// Dismiss the evaluation and start over with a blank draft.
    pub async fn close_evaluation(&self) {
        self.evaluator.clear().await;
        self.state.lock().await.booking = BookingDraft::default();
    }

    pub async fn status(&self) -> CallStatus {
        let state = self.state.lock().await;
        CallStatus {
            connection: self.session.state(),
            call_id: state.call_id.clone(),
            started_at: state.started_at,
            ended_at: state.ended_at,
            duration_secs: state.started_at.map(|t| {
                let until = state.ended_at.unwrap_or_else(Utc::now);
                until.signed_duration_since(t).num_milliseconds() as f64 / 1000.0
            }),
            voice: state.voice.clone(),
            active: state.active,
            customer_speaking: state.customer_speaking,
            status_message: state.status_message.clone(),
            generating_suggestions: self.suggestions.is_generating(),
            booking_submitted: state.booking_submitted,
        }
    }

    pub async fn chat_log(&self) -> Vec<ChatMessage> {
        self.state.lock().await.chat.messages().to_vec()
    }

    pub async fn transcript(&self) -> String {
        self.state.lock().await.transcript.render()
    }

    pub async fn suggestions(&self) -> Vec<String> {
        self.suggestions.suggestions().await
    }

    pub async fn evaluation(&self) -> Option<CallEvaluation> {
        self.evaluator.evaluation().await
    }
}

impl Drop for Trainer {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    mut settle: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
    state: Arc<Mutex<CallState>>,
    suggestions: SuggestionRequester,
    evaluator: EvaluationRequester,
) {
    loop {
        tokio::select! {
            biased;

            event = events.recv() => match event {
                Some(event) => apply_event(event, &state, &suggestions, &evaluator).await,
                None => break,
            },

            Some(ack) = settle.recv() => {
                // Everything the session sent before the request is queued already
                while let Ok(event) = events.try_recv() {
                    apply_event(event, &state, &suggestions, &evaluator).await;
                }
                let _ = ack.send(());
            }
        }
    }
}

async fn apply_event(
    event: SessionEvent,
    state: &Mutex<CallState>,
    suggestions: &SuggestionRequester,
    evaluator: &EvaluationRequester,
) {
    match event {
        SessionEvent::Open => {
            {
                let mut state = state.lock().await;
                state.call_id = Some(format!("call-{}", uuid::Uuid::new_v4()));
                state.started_at = Some(Utc::now());
                state.ended_at = None;
                state.active = true;
                state.status_message = None;
                state.chat.clear();
                state.transcript.clear();
            }
            evaluator.clear().await;
            suggestions.set(vec![GREETING.to_string()]).await;
            info!("Call connected");
        }
        SessionEvent::Close => {
            let mut state = state.lock().await;
            state.active = false;
            state.customer_speaking = false;
            if state.started_at.is_some() && state.ended_at.is_none() {
                state.ended_at = Some(Utc::now());
            }
            info!("Call ended");
        }
        SessionEvent::Error(message) => {
            warn!("Call error: {}", message);
            let mut state = state.lock().await;
            state.status_message = Some(message);
            state.active = false;
        }
        SessionEvent::Speaking(speaking) => {
            state.lock().await.customer_speaking = speaking;
        }
        SessionEvent::Transcript(update) => {
            let mut state = state.lock().await;
            state.chat.apply(&update);
            // Suggestions follow each finished customer line
            if state.transcript.record(&update) && update.role == Role::Customer {
                suggestions.trigger(state.transcript.render());
            }
        }
    }
}
