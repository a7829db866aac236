//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the stateless reply endpoint and the session endpoints under one
//! Axum router. Every request is traced by `TraceLayer`; CORS is open so a
//! browser widget on another origin can call the API directly.

pub mod chat;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full API router with tracing and CORS layers applied.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chatbot/respond", post(chat::respond))
        .route("/api/sessions", post(chat::create_session))
        .route("/api/sessions/{id}", get(chat::get_session).delete(chat::delete_session))
        .route("/api/sessions/{id}/open", post(chat::open_session))
        .route("/api/sessions/{id}/close", post(chat::close_session))
        .route("/api/sessions/{id}/draft", put(chat::edit_draft))
        .route("/api/sessions/{id}/submit", post(chat::submit))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
