//! Chat session — the conversation state behind one chat widget.
//!
//! DESIGN
//! ======
//! A session is closed, open and idle, or open and awaiting a reply. The
//! transcript is append-only and only grows: the greeting on the first open,
//! then one user message and exactly one bot message per accepted submit.
//!
//! Submitting is split in two so no lock is held across generation:
//! `submit` records the user message and hands back a [`PendingReply`]
//! tagged with a fresh request ID; `resolve` accepts the outcome for that ID
//! only, so a stale or duplicate resolution can never add a second bot reply.
//!
//! Closing hides the session without cancelling anything. A reply that
//! resolves while closed still lands in the transcript.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::reply::{ReplyError, ReplyRequest, ReplyResponse};

/// Seeded as the first bot message when a session first opens.
pub const GREETING: &str = "Hello! How can I help you today? Ask about appointments, emergencies, or departments.";

/// Appended in place of a reply when generation fails.
pub const ERROR_FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again later.";

const NOTIFICATION_TITLE: &str = "Error";
const NOTIFICATION_DESCRIPTION: &str = "Failed to get response from the bot.";

// =============================================================================
// TRANSCRIPT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One transcript entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    fn user(text: impl Into<String>) -> Self {
        Self { sender: Sender::User, text: text.into() }
    }

    fn bot(text: impl Into<String>) -> Self {
        Self { sender: Sender::Bot, text: text.into() }
    }
}

// =============================================================================
// NOTIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Destructive,
}

/// Transient alert raised once per failed reply. Never enters the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub variant: NotificationVariant,
    pub title: String,
    pub description: String,
}

impl Notification {
    #[must_use]
    pub fn reply_failed() -> Self {
        Self {
            variant: NotificationVariant::Destructive,
            title: NOTIFICATION_TITLE.into(),
            description: NOTIFICATION_DESCRIPTION.into(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Why a submit was ignored. The session is left untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("draft is empty")]
    EmptyDraft,
    #[error("a reply is already pending")]
    AwaitingReply,
    #[error("session is closed")]
    Closed,
}

impl crate::error::ErrorCode for SubmitError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyDraft => "E_EMPTY_MESSAGE",
            Self::AwaitingReply => "E_AWAITING_REPLY",
            Self::Closed => "E_SESSION_CLOSED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::AwaitingReply)
    }
}

/// A resolution arrived for a request this session is not waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no pending reply for request {0}")]
pub struct StaleReply(pub Uuid);

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Closed,
    OpenIdle,
    OpenAwaiting,
}

/// An accepted submit whose reply has not been generated yet.
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub request_id: Uuid,
    pub request: ReplyRequest,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    is_open: bool,
    transcript: Vec<Message>,
    pending_input: String,
    /// Request ID of the in-flight reply, if any.
    in_flight: Option<Uuid>,
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), is_open: false, transcript: Vec::new(), pending_input: String::new(), in_flight: None }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub fn is_awaiting_reply(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    #[must_use]
    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match (self.is_open, self.is_awaiting_reply()) {
            (false, _) => SessionPhase::Closed,
            (true, false) => SessionPhase::OpenIdle,
            (true, true) => SessionPhase::OpenAwaiting,
        }
    }

    /// Show the session. Seeds the greeting if the transcript is empty and
    /// returns whether it did.
    pub fn open(&mut self) -> bool {
        self.is_open = true;
        if self.transcript.is_empty() {
            self.transcript.push(Message::bot(GREETING));
            return true;
        }
        false
    }

    /// Hide the session. Transcript, draft and any in-flight reply survive.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn edit_draft(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    /// Accept the current draft: append it as a user message, clear the
    /// draft and enter the awaiting state.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] and leaves the session unchanged if it is
    /// closed, already awaiting a reply, or the trimmed draft is empty.
    pub fn submit(&mut self) -> Result<PendingReply, SubmitError> {
        if !self.is_open {
            return Err(SubmitError::Closed);
        }
        if self.in_flight.is_some() {
            return Err(SubmitError::AwaitingReply);
        }
        let text = self.pending_input.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyDraft);
        }

        let text = text.to_string();
        self.pending_input.clear();
        self.transcript.push(Message::user(text.clone()));

        let request_id = Uuid::new_v4();
        self.in_flight = Some(request_id);
        Ok(PendingReply { request_id, request: ReplyRequest::new(text) })
    }

    /// Apply the outcome of a pending reply: append the reply, or the error
    /// fallback plus a notification on failure, and leave the awaiting state.
    ///
    /// # Errors
    ///
    /// Returns [`StaleReply`] without touching the session if `request_id`
    /// is not the in-flight request.
    pub fn resolve(
        &mut self,
        request_id: Uuid,
        outcome: Result<ReplyResponse, ReplyError>,
    ) -> Result<Option<Notification>, StaleReply> {
        if self.in_flight != Some(request_id) {
            return Err(StaleReply(request_id));
        }
        self.in_flight = None;

        match outcome {
            Ok(response) => {
                self.transcript.push(Message::bot(response.reply));
                Ok(None)
            }
            Err(ReplyError::LlmNotConfigured | ReplyError::Generation(_)) => Ok(Some(self.settle_failed())),
            // `submit` never dispatches a blank draft; settle it like any failure.
            Err(ReplyError::EmptyMessage) => Ok(Some(self.settle_failed())),
        }
    }

    fn settle_failed(&mut self) -> Notification {
        self.transcript.push(Message::bot(ERROR_FALLBACK_REPLY));
        Notification::reply_failed()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            phase: self.phase(),
            is_open: self.is_open,
            transcript: self.transcript.clone(),
            pending_input: self.pending_input.clone(),
            is_awaiting_reply: self.is_awaiting_reply(),
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub is_open: bool,
    pub transcript: Vec<Message>,
    pub pending_input: String,
    pub is_awaiting_reply: bool,
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
