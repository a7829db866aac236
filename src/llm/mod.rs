//! LLM — provider clients behind the [`LlmChat`] trait.
//!
//! Each provider client carries its own model name and implements
//! [`LlmChat`] directly. [`connect`] picks one from an [`LlmConfig`]; the rest
//! of the crate only holds `Arc<dyn LlmChat>`, which tests swap for a mock.

pub mod anthropic;
pub mod config;
pub mod openai;
pub mod types;

use std::sync::Arc;

pub use config::LlmConfig;
use config::LlmProviderKind;
pub use types::LlmChat;
use types::LlmError;

/// Build the reply backend named by `config.provider`.
///
/// # Errors
///
/// Returns [`LlmError::HttpClientBuild`] if the provider HTTP client fails to build.
pub fn connect(config: LlmConfig) -> Result<Arc<dyn LlmChat>, LlmError> {
    let LlmConfig { provider, api_key, model, openai_mode, openai_base_url, timeouts } = config;
    let client: Arc<dyn LlmChat> = match provider {
        LlmProviderKind::Anthropic => Arc::new(anthropic::AnthropicClient::new(api_key, model, timeouts)?),
        LlmProviderKind::OpenAi => {
            Arc::new(openai::OpenAiClient::new(api_key, model, openai_mode, openai_base_url, timeouts)?)
        }
    };
    Ok(client)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
