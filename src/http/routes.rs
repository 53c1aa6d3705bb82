use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Call control
        .route("/call/start", post(handlers::start_call))
        .route("/call/end", post(handlers::end_call))
        // Live view
        .route("/call/status", get(handlers::get_status))
        .route("/call/chat", get(handlers::get_chat))
        .route("/call/transcript", get(handlers::get_transcript))
        .route("/call/suggestions", get(handlers::get_suggestions))
        // Booking
        .route(
            "/booking",
            get(handlers::get_booking).put(handlers::update_booking),
        )
        .route("/booking/submit", post(handlers::submit_booking))
        // Evaluation
        .route(
            "/evaluation",
            get(handlers::get_evaluation).delete(handlers::close_evaluation),
        )
        // Request logging, and CORS for a browser front end on another origin
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
