//! Chat service — drives sessions held in `AppState` through the reply flow.
//!
//! DESIGN
//! ======
//! Every operation takes the sessions write lock only long enough to apply
//! one transition. `submit` releases the lock while the reply is generated,
//! so other sessions (and reads of this one) are never blocked by the LLM.
//! The session's request ID guarantees the re-acquired lock resolves the
//! same request that was dispatched.
//!
//! Once a submit is accepted, generation and resolution run on their own
//! task. The caller only waits for it, so a dropped request (client gone,
//! proxy timeout) cannot leave the session stuck awaiting a reply.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::services::reply;
use crate::session::{ChatSession, Notification, PendingReply, SessionSnapshot, StaleReply, SubmitError};
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    StaleReply(#[from] StaleReply),
    #[error("reply task failed: {0}")]
    SettleFailed(String),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::Submit(e) => e.error_code(),
            Self::StaleReply(_) => "E_STALE_REPLY",
            Self::SettleFailed(_) => "E_SETTLE_FAILED",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Submit(e) => e.retryable(),
            Self::NotFound(_) | Self::StaleReply(_) | Self::SettleFailed(_) => false,
        }
    }
}

/// Result of a completed submit: the settled session plus any notification
/// the user should see.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub session: SessionSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

pub async fn create_session(state: &AppState) -> SessionSnapshot {
    let session = ChatSession::new();
    let snapshot = session.snapshot();
    state.sessions.write().await.insert(session.id(), session);
    info!(session_id = %snapshot.id, "chat: session created");
    snapshot
}

/// # Errors
///
/// Returns [`ChatError::NotFound`] if no session has this ID.
pub async fn get_session(state: &AppState, session_id: Uuid) -> Result<SessionSnapshot, ChatError> {
    let sessions = state.sessions.read().await;
    sessions
        .get(&session_id)
        .map(ChatSession::snapshot)
        .ok_or(ChatError::NotFound(session_id))
}

/// # Errors
///
/// Returns [`ChatError::NotFound`] if no session has this ID.
pub async fn delete_session(state: &AppState, session_id: Uuid) -> Result<(), ChatError> {
    state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or(ChatError::NotFound(session_id))?;
    info!(%session_id, "chat: session deleted");
    Ok(())
}

/// # Errors
///
/// Returns [`ChatError::NotFound`] if no session has this ID.
pub async fn open_session(state: &AppState, session_id: Uuid) -> Result<SessionSnapshot, ChatError> {
    with_session(state, session_id, |session| {
        if session.open() {
            info!(%session_id, "chat: greeting seeded");
        }
        session.snapshot()
    })
    .await
}

/// # Errors
///
/// Returns [`ChatError::NotFound`] if no session has this ID.
pub async fn close_session(state: &AppState, session_id: Uuid) -> Result<SessionSnapshot, ChatError> {
    with_session(state, session_id, |session| {
        session.close();
        session.snapshot()
    })
    .await
}

/// # Errors
///
/// Returns [`ChatError::NotFound`] if no session has this ID.
pub async fn edit_draft(state: &AppState, session_id: Uuid, text: String) -> Result<SessionSnapshot, ChatError> {
    with_session(state, session_id, |session| {
        session.edit_draft(text);
        session.snapshot()
    })
    .await
}

// =============================================================================
// SUBMIT
// =============================================================================

/// Submit the session's draft and wait for the reply to settle.
///
/// Generation failures are not errors here: they settle the session with the
/// fallback message and come back as a notification.
///
/// # Errors
///
/// Returns [`ChatError::Submit`] if the session rejects the draft,
/// [`ChatError::NotFound`] if the session is missing before dispatch or was
/// deleted while the reply was generating, and [`ChatError::SettleFailed`]
/// if the reply task panicked.
pub async fn submit(state: &AppState, session_id: Uuid) -> Result<SubmitOutcome, ChatError> {
    let pending = with_session(state, session_id, ChatSession::submit).await??;

    info!(%session_id, request_id = %pending.request_id, "chat: reply requested");
    let settle = tokio::spawn(settle_reply(state.clone(), session_id, pending));
    match settle.await {
        Ok(result) => result,
        Err(e) => {
            warn!(%session_id, error = %e, "chat: reply task failed");
            Err(ChatError::SettleFailed(e.to_string()))
        }
    }
}

/// Generate the reply for an accepted submit and resolve it into the session.
async fn settle_reply(state: AppState, session_id: Uuid, pending: PendingReply) -> Result<SubmitOutcome, ChatError> {
    let outcome = reply::respond(state.llm.as_deref(), &pending.request).await;

    let (session, notification) = with_session(&state, session_id, |session| {
        let notification = session.resolve(pending.request_id, outcome)?;
        Ok::<_, ChatError>((session.snapshot(), notification))
    })
    .await??;

    if let Some(notification) = &notification {
        warn!(%session_id, description = %notification.description, "chat: reply failed, user notified");
    } else {
        info!(%session_id, transcript_len = session.transcript.len(), "chat: reply delivered");
    }

    Ok(SubmitOutcome { session, notification })
}

async fn with_session<T>(
    state: &AppState,
    session_id: Uuid,
    f: impl FnOnce(&mut ChatSession) -> T,
) -> Result<T, ChatError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or(ChatError::NotFound(session_id))?;
    Ok(f(session))
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
