//! HTTP API for driving a training call
//!
//! This module provides a REST API around the [`Trainer`](crate::trainer::Trainer):
//! - POST /call/start, POST /call/end - Dial and hang up
//! - GET /call/status, /call/chat, /call/transcript, /call/suggestions - Live view
//! - GET|PUT /booking, POST /booking/submit - Booking draft
//! - GET|DELETE /evaluation - Post-call score card
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
