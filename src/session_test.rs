use super::*;
use crate::error::ErrorCode;
use crate::llm::types::LlmError;

fn open_session() -> ChatSession {
    let mut session = ChatSession::new();
    session.open();
    session
}

fn ok(reply: &str) -> Result<ReplyResponse, ReplyError> {
    Ok(ReplyResponse { reply: reply.into() })
}

fn failed() -> Result<ReplyResponse, ReplyError> {
    Err(ReplyError::Generation(LlmError::ApiRequest("connection refused".into())))
}

// =========================================================================
// open / close
// =========================================================================

#[test]
fn new_session_is_closed_and_empty() {
    let session = ChatSession::new();
    assert_eq!(session.phase(), SessionPhase::Closed);
    assert!(session.transcript().is_empty());
    assert_eq!(session.pending_input(), "");
}

#[test]
fn first_open_seeds_greeting() {
    let mut session = ChatSession::new();
    assert!(session.open());
    assert_eq!(session.phase(), SessionPhase::OpenIdle);
    assert_eq!(session.transcript(), &[Message { sender: Sender::Bot, text: GREETING.into() }]);
}

#[test]
fn reopen_does_not_duplicate_greeting() {
    let mut session = open_session();
    session.close();
    assert!(!session.open());
    assert_eq!(session.transcript().len(), 1);
}

#[test]
fn close_and_reopen_preserves_transcript_and_draft() {
    let mut session = open_session();
    session.edit_draft("Where is Pediatrics?");
    let pending = session.submit().unwrap();
    session.resolve(pending.request_id, ok("Second floor.")).unwrap();
    session.edit_draft("half typed");

    let before = session.transcript().to_vec();
    session.close();
    assert_eq!(session.phase(), SessionPhase::Closed);
    session.open();

    assert_eq!(session.transcript(), before.as_slice());
    assert_eq!(session.pending_input(), "half typed");
}

// =========================================================================
// submit
// =========================================================================

#[test]
fn submit_appends_trimmed_user_message_and_awaits() {
    let mut session = open_session();
    session.edit_draft("  How do I book an appointment?  ");
    let pending = session.submit().unwrap();

    assert_eq!(pending.request.user_message, "How do I book an appointment?");
    assert_eq!(session.phase(), SessionPhase::OpenAwaiting);
    assert_eq!(session.pending_input(), "");
    assert_eq!(
        session.transcript().last(),
        Some(&Message { sender: Sender::User, text: "How do I book an appointment?".into() })
    );
}

#[test]
fn submit_blank_draft_is_rejected() {
    let mut session = open_session();
    session.edit_draft("   \n ");
    assert_eq!(session.submit().unwrap_err(), SubmitError::EmptyDraft);
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.pending_input(), "   \n ");
    assert_eq!(session.phase(), SessionPhase::OpenIdle);
}

#[test]
fn submit_while_awaiting_is_rejected() {
    let mut session = open_session();
    session.edit_draft("first");
    session.submit().unwrap();
    session.edit_draft("second");

    assert_eq!(session.submit().unwrap_err(), SubmitError::AwaitingReply);
    assert_eq!(session.transcript().len(), 2);
    assert_eq!(session.pending_input(), "second");
}

#[test]
fn submit_while_closed_is_rejected() {
    let mut session = open_session();
    session.close();
    session.edit_draft("hello");
    assert_eq!(session.submit().unwrap_err(), SubmitError::Closed);
    assert_eq!(session.transcript().len(), 1);
}

// =========================================================================
// resolve
// =========================================================================

#[test]
fn successful_reply_appends_bot_message() {
    let mut session = open_session();
    session.edit_draft("Where is Cardiology?");
    let pending = session.submit().unwrap();
    let notification = session.resolve(pending.request_id, ok("Cardiology is on floor 3.")).unwrap();

    assert!(notification.is_none());
    assert_eq!(session.phase(), SessionPhase::OpenIdle);
    assert_eq!(session.transcript().len(), 3);
    assert_eq!(
        session.transcript()[2],
        Message { sender: Sender::Bot, text: "Cardiology is on floor 3.".into() }
    );
}

#[test]
fn failed_reply_appends_fallback_and_notifies_once() {
    let mut session = open_session();
    session.edit_draft("hello");
    let pending = session.submit().unwrap();
    let notification = session.resolve(pending.request_id, failed()).unwrap();

    assert_eq!(notification, Some(Notification::reply_failed()));
    assert_eq!(session.transcript().last().unwrap().text, ERROR_FALLBACK_REPLY);
    assert_eq!(session.transcript().len(), 3);
    assert!(!session.is_awaiting_reply());
}

#[test]
fn unconfigured_backend_settles_as_failure() {
    let mut session = open_session();
    session.edit_draft("hello");
    let pending = session.submit().unwrap();
    let notification = session.resolve(pending.request_id, Err(ReplyError::LlmNotConfigured)).unwrap();

    assert_eq!(notification, Some(Notification::reply_failed()));
    assert_eq!(session.transcript().last().unwrap().text, ERROR_FALLBACK_REPLY);
    assert_eq!(session.phase(), SessionPhase::OpenIdle);
}

#[test]
fn empty_message_error_still_settles_once() {
    let mut session = open_session();
    session.edit_draft("hello");
    let pending = session.submit().unwrap();
    let notification = session.resolve(pending.request_id, Err(ReplyError::EmptyMessage)).unwrap();

    assert!(notification.is_some());
    assert_eq!(session.transcript().len(), 3);
    assert!(!session.is_awaiting_reply());
}

#[test]
fn duplicate_resolution_is_stale() {
    let mut session = open_session();
    session.edit_draft("hello");
    let pending = session.submit().unwrap();
    session.resolve(pending.request_id, ok("hi")).unwrap();

    let err = session.resolve(pending.request_id, ok("again")).unwrap_err();
    assert_eq!(err, StaleReply(pending.request_id));
    assert_eq!(session.transcript().len(), 3);
}

#[test]
fn unknown_request_id_is_stale() {
    let mut session = open_session();
    session.edit_draft("hello");
    session.submit().unwrap();

    assert!(session.resolve(Uuid::new_v4(), ok("stray")).is_err());
    assert!(session.is_awaiting_reply());
    assert_eq!(session.transcript().len(), 2);
}

#[test]
fn reply_lands_after_close() {
    let mut session = open_session();
    session.edit_draft("hello");
    let pending = session.submit().unwrap();
    session.close();
    session.resolve(pending.request_id, ok("hi there")).unwrap();

    assert_eq!(session.phase(), SessionPhase::Closed);
    session.open();
    assert_eq!(session.transcript().last().unwrap().text, "hi there");
}

#[test]
fn each_submit_adds_exactly_two_messages() {
    let mut session = open_session();
    for (i, question) in ["one", "two", "three"].into_iter().enumerate() {
        session.edit_draft(question);
        let pending = session.submit().unwrap();
        session.resolve(pending.request_id, ok("answer")).unwrap();
        assert_eq!(session.transcript().len(), 1 + 2 * (i + 1));
    }
}

// =========================================================================
// snapshot + errors
// =========================================================================

#[test]
fn snapshot_serializes_camel_case() {
    let mut session = open_session();
    session.edit_draft("draft");
    let value = serde_json::to_value(session.snapshot()).unwrap();

    assert_eq!(value["isOpen"], true);
    assert_eq!(value["isAwaitingReply"], false);
    assert_eq!(value["pendingInput"], "draft");
    assert_eq!(value["phase"], "open-idle");
    assert_eq!(value["transcript"][0]["sender"], "bot");
    assert_eq!(value["transcript"][0]["text"], GREETING);
}

#[test]
fn notification_serializes_variant_lowercase() {
    let value = serde_json::to_value(Notification::reply_failed()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "variant": "destructive",
            "title": "Error",
            "description": "Failed to get response from the bot."
        })
    );
}

#[test]
fn submit_error_codes() {
    assert_eq!(SubmitError::EmptyDraft.error_code(), "E_EMPTY_MESSAGE");
    assert_eq!(SubmitError::AwaitingReply.error_code(), "E_AWAITING_REPLY");
    assert_eq!(SubmitError::Closed.error_code(), "E_SESSION_CLOSED");
    assert!(SubmitError::AwaitingReply.retryable());
    assert!(!SubmitError::Closed.retryable());
}
