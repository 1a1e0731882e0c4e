use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

/// Build the HTTP router. Endpoints are served both at the root and under
/// `/api`, the prefix used by the serverless deployments.
pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let endpoints = Router::new()
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/validateCode", post(handlers::validate::validate_handler));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .merge(endpoints.clone())
        .nest("/api", endpoints)
        .with_state(state)
        // The static front-end is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(DefaultBodyLimit::max(body_limit))
}
