use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::prompts::{evaluation_prompt, evaluation_schema};
use super::{GenerationError, TextGenerator};
use crate::trainer::BookingDraft;

/// How closely the submitted booking matched the caller's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingAccuracy {
    Perfect,
    Good,
    #[serde(rename = "Needs Work")]
    NeedsWork,
}

/// Post-call score card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvaluation {
    /// 0-100
    pub score: f64,
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub booking_accuracy: BookingAccuracy,
}

/// Scores a finished call against the booking the agent submitted
///
/// Runs at most once per call and is never retried. A result that arrives
/// after the call ended is still stored.
#[derive(Clone)]
pub struct EvaluationRequester {
    generator: Arc<dyn TextGenerator>,
    evaluation: Arc<RwLock<Option<CallEvaluation>>>,
}

impl EvaluationRequester {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            evaluation: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn evaluation(&self) -> Option<CallEvaluation> {
        self.evaluation.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.evaluation.write().await = None;
    }

    /// Request an evaluation and store it on success.
    pub async fn evaluate(
        &self,
        transcript: &str,
        booking: &BookingDraft,
    ) -> Result<CallEvaluation, GenerationError> {
        let booking_json = serde_json::to_string(booking)?;
        let text = self
            .generator
            .generate_json(
                &evaluation_prompt(transcript, &booking_json),
                &evaluation_schema(),
            )
            .await?;
        let evaluation = parse_evaluation(&text)?;

        info!(
            "Call evaluated: score {} ({:?})",
            evaluation.score, evaluation.booking_accuracy
        );
        *self.evaluation.write().await = Some(evaluation.clone());
        Ok(evaluation)
    }

    /// Run [`evaluate`](Self::evaluate) on a new task; failures are logged.
    pub fn trigger(&self, transcript: String, booking: BookingDraft) -> JoinHandle<()> {
        let requester = self.clone();
        tokio::spawn(async move {
            if let Err(e) = requester.evaluate(&transcript, &booking).await {
                error!("Evaluation failed: {}", e);
            }
        })
    }
}

fn parse_evaluation(text: &str) -> Result<CallEvaluation, GenerationError> {
    let evaluation: CallEvaluation = serde_json::from_str(text)?;
    if !(0.0..=100.0).contains(&evaluation.score) {
        return Err(GenerationError::Schema(format!(
            "score {} outside 0-100",
            evaluation.score
        )));
    }
    Ok(evaluation)
}
