//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the live chat sessions, each keyed by its UUID, and the optional
//! generation backend. Sessions live only in memory and vanish on restart.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::llm::LlmChat;
use crate::session::ChatSession;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; every field is Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, ChatSession>>>,
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), llm }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::{Value, json};
    use tokio::sync::Notify;

    use super::*;
    use crate::llm::types::{ChatResponse, ContentBlock, LlmError, Message, Tool};

    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(None)
    }

    #[must_use]
    pub fn test_app_state_with_llm(llm: Arc<dyn LlmChat>) -> AppState {
        AppState::new(Some(llm))
    }

    /// Insert an open session (greeting seeded) and return its ID.
    pub async fn seed_open_session(state: &AppState) -> Uuid {
        let mut session = ChatSession::new();
        session.open();
        let id = session.id();
        state.sessions.write().await.insert(id, session);
        id
    }

    /// A response carrying one `reply` tool call with the given input.
    #[must_use]
    pub fn tool_response(input: Value) -> ChatResponse {
        ChatResponse {
            content: vec![ContentBlock::ToolUse { id: "tu_1".into(), name: "reply".into(), input }],
            model: "mock".into(),
            stop_reason: "tool_use".into(),
            input_tokens: 10,
            output_tokens: 5,
        }
    }

    #[must_use]
    pub fn reply_response(reply: &str) -> ChatResponse {
        tool_response(json!({ "reply": reply }))
    }

    #[must_use]
    pub fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            content: vec![ContentBlock::Text { text: text.into() }],
            model: "mock".into(),
            stop_reason: "end_turn".into(),
            input_tokens: 10,
            output_tokens: 5,
        }
    }

    /// What the mock saw on one `chat` call.
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub max_tokens: u32,
        pub system: String,
        pub messages: Vec<Message>,
        pub tool_names: Vec<String>,
    }

    /// Scripted LLM: pops one queued result per call and records the request.
    pub struct MockLlm {
        responses: Mutex<VecDeque<Result<ChatResponse, LlmError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockLlm {
        #[must_use]
        pub fn new(responses: Vec<Result<ChatResponse, LlmError>>) -> Self {
            Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) }
        }

        #[must_use]
        pub fn replying(reply: &str) -> Self {
            Self::new(vec![Ok(reply_response(reply))])
        }

        #[must_use]
        pub fn failing() -> Self {
            Self::new(vec![Err(LlmError::ApiRequest("connection refused".into()))])
        }

        #[must_use]
        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for MockLlm {
        async fn chat(
            &self,
            max_tokens: u32,
            system: &str,
            messages: &[Message],
            tools: Option<&[Tool]>,
        ) -> Result<ChatResponse, LlmError> {
            self.calls.lock().unwrap().push(RecordedCall {
                max_tokens,
                system: system.to_string(),
                messages: messages.to_vec(),
                tool_names: tools
                    .unwrap_or_default()
                    .iter()
                    .map(|t| t.name.clone())
                    .collect(),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(reply_response("done")))
        }
    }

    /// LLM that parks every call until the test releases it.
    pub struct GatedLlm {
        pub entered: Notify,
        pub release: Notify,
        reply: String,
    }

    impl GatedLlm {
        #[must_use]
        pub fn new(reply: &str) -> Self {
            Self { entered: Notify::new(), release: Notify::new(), reply: reply.into() }
        }
    }

    #[async_trait::async_trait]
    impl LlmChat for GatedLlm {
        async fn chat(
            &self,
            _max_tokens: u32,
            _system: &str,
            _messages: &[Message],
            _tools: Option<&[Tool]>,
        ) -> Result<ChatResponse, LlmError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(reply_response(&self.reply))
        }
    }
}
