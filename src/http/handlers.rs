use super::state::AppState;
use crate::coach::CallEvaluation;
use crate::trainer::{BookingDraft, ScenarioOptions, TrainerError};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub status: String,
    pub voice: String,
}

#[derive(Debug, Serialize)]
pub struct EndCallResponse {
    pub status: String,
    /// An evaluation was requested and will show up under /evaluation
    pub evaluating: bool,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
    pub generating: bool,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub evaluation: Option<CallEvaluation>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for TrainerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrainerError::CallInProgress => StatusCode::CONFLICT,
            TrainerError::UnknownVoice(_) | TrainerError::NoRoomSelected => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            TrainerError::Live(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /call/start
/// Dial a simulated customer; the body is optional
pub async fn start_call(
    State(state): State<AppState>,
    options: Option<Json<ScenarioOptions>>,
) -> Result<Json<StartCallResponse>, TrainerError> {
    let options = options.map(|Json(o)| o).unwrap_or_default();
    let voice = state.trainer.start_call(options).await?;

    Ok(Json(StartCallResponse {
        status: "connected".to_string(),
        voice,
    }))
}

/// POST /call/end
pub async fn end_call(State(state): State<AppState>) -> impl IntoResponse {
    let evaluating = state.trainer.status().await.booking_submitted;
    state.trainer.end_call().await;

    Json(EndCallResponse {
        status: "ended".to_string(),
        evaluating,
    })
}

/// GET /call/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.trainer.status().await)
}

/// GET /call/chat
pub async fn get_chat(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.trainer.chat_log().await)
}

/// GET /call/transcript
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    Json(TranscriptResponse {
        transcript: state.trainer.transcript().await,
    })
}

/// GET /call/suggestions
pub async fn get_suggestions(State(state): State<AppState>) -> impl IntoResponse {
    let generating = state.trainer.status().await.generating_suggestions;
    Json(SuggestionsResponse {
        suggestions: state.trainer.suggestions().await,
        generating,
    })
}

/// GET /booking
pub async fn get_booking(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.trainer.booking().await)
}

/// PUT /booking
/// Replace the booking draft
pub async fn update_booking(
    State(state): State<AppState>,
    Json(draft): Json<BookingDraft>,
) -> impl IntoResponse {
    state.trainer.update_booking(draft.clone()).await;
    Json(draft)
}

/// POST /booking/submit
pub async fn submit_booking(
    State(state): State<AppState>,
) -> Result<Json<BookingDraft>, TrainerError> {
    let booking = state.trainer.submit_booking().await?;
    info!("Booking submitted via API");
    Ok(Json(booking))
}

/// GET /evaluation
pub async fn get_evaluation(State(state): State<AppState>) -> impl IntoResponse {
    Json(EvaluationResponse {
        evaluation: state.trainer.evaluation().await,
    })
}

/// DELETE /evaluation
/// Dismiss the score card and reset the booking draft
pub async fn close_evaluation(State(state): State<AppState>) -> impl IntoResponse {
    state.trainer.close_evaluation().await;
    StatusCode::NO_CONTENT
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
