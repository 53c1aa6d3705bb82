use crate::trainer::Trainer;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub trainer: Arc<Trainer>,
}

impl AppState {
    pub fn new(trainer: Arc<Trainer>) -> Self {
        Self { trainer }
    }
}
