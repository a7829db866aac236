//! Chatbot and session routes.
//!
//! Handlers only translate between HTTP and the chat services. Errors render
//! as `{ code, message, retryable }` with a status picked per error kind.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ErrorBody, ErrorCode};
use crate::services::chat::{self, ChatError, SubmitOutcome};
use crate::services::reply::{self, ReplyError, ReplyRequest, ReplyResponse};
use crate::session::{SessionSnapshot, SubmitError};
use crate::state::AppState;

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, err: &impl ErrorCode) -> Self {
        Self { status, body: ErrorBody::from_error(err) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ReplyError> for ApiError {
    fn from(err: ReplyError) -> Self {
        Self::new(reply_error_to_status(&err), &err)
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self::new(chat_error_to_status(&err), &err)
    }
}

pub(crate) fn reply_error_to_status(err: &ReplyError) -> StatusCode {
    match err {
        ReplyError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
        ReplyError::LlmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ReplyError::Generation(_) => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn chat_error_to_status(err: &ChatError) -> StatusCode {
    match err {
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Submit(SubmitError::EmptyDraft) => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::Submit(SubmitError::AwaitingReply | SubmitError::Closed) | ChatError::StaleReply(_) => {
            StatusCode::CONFLICT
        }
        ChatError::SettleFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/chatbot/respond` — one-shot reply, no session.
pub async fn respond(
    State(state): State<AppState>,
    Json(body): Json<ReplyRequest>,
) -> Result<Json<ReplyResponse>, ApiError> {
    body.validate()?;
    let response = reply::respond(state.llm.as_deref(), &body).await?;
    Ok(Json(response))
}

/// `POST /api/sessions` — create a closed, empty session.
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionSnapshot>) {
    (StatusCode::CREATED, Json(chat::create_session(&state).await))
}

/// `GET /api/sessions/:id`
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(chat::get_session(&state, id).await?))
}

/// `DELETE /api/sessions/:id`
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    chat::delete_session(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/open`
pub async fn open_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(chat::open_session(&state, id).await?))
}

/// `POST /api/sessions/:id/close`
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(chat::close_session(&state, id).await?))
}

#[derive(Deserialize)]
pub struct DraftBody {
    pub text: String,
}

/// `PUT /api/sessions/:id/draft` — replace the pending input.
pub async fn edit_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DraftBody>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(chat::edit_draft(&state, id, body.text).await?))
}

/// `POST /api/sessions/:id/submit` — submit the draft and wait for the reply.
pub async fn submit(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SubmitOutcome>, ApiError> {
    Ok(Json(chat::submit(&state, id).await?))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
