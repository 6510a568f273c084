//! LLM provider layer.
//!
//! A uniform async interface over the hosted vendors. Each adapter owns its
//! injected rate limiter and resolves credentials through the privileged key
//! store on every request; vendor model ids never leave this module.

mod anthropic;
mod factory;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::{ProviderFactory, ProviderSelector};
pub use openai::OpenAiProvider;

use crate::error::Result;
use crate::message::{HistoryMessage, TokenUsage};
use crate::models::Vendor;
use async_trait::async_trait;

/// A finished vendor response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    /// Vendor-reported counts; absent on streamed responses.
    pub usage: Option<TokenUsage>,
}

/// Incremental-output callback: the chunk text, plus a prompt-token estimate
/// delivered with the first chunk where the adapter can produce one. Chunk
/// boundaries carry no word or sentence alignment.
pub type StreamCallback<'a> = &'a mut (dyn FnMut(&str, Option<u32>) + Send);

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Run one chat turn against the vendor.
    ///
    /// Order of operations is fixed: local rate-limit check first (fail fast,
    /// no I/O), then credentials, then history, then the request. The attempt
    /// is counted against the limiter whether or not the vendor call succeeds.
    async fn get_response(
        &self,
        message: &str,
        user_id: &str,
        session_id: &str,
        model_alias: Option<&str>,
        on_stream: Option<StreamCallback<'_>>,
    ) -> Result<Completion>;

    /// Minimal-cost probe. False on any failure; never errors.
    async fn validate_api_key(&self, user_id: &str) -> bool;

    /// Last `limit` turns of a session, oldest first, in vendor vocabulary.
    fn conversation_history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryMessage>>;
}

/// System prompt prepended by adapters whose API takes a system role.
pub(crate) const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";
