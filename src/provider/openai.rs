//! OpenAI chat-completions adapter.

use super::{ChatProvider, Completion, StreamCallback, SYSTEM_PROMPT};
use crate::credentials::{ApiKeyStore, SERVICE_OPENAI};
use crate::error::{ChatError, Result};
use crate::message::{HistoryMessage, Role, TokenUsage};
use crate::models::{self, Vendor};
use crate::ratelimit::RateLimiter;
use crate::store::ConversationStore;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

pub struct OpenAiProvider {
    keys: ApiKeyStore,
    store: ConversationStore,
    limiter: RateLimiter,
    base_url: String,
    history_limit: usize,
}

impl OpenAiProvider {
    pub fn new(
        keys: ApiKeyStore,
        store: ConversationStore,
        limiter: RateLimiter,
        base_url: impl Into<String>,
        history_limit: usize,
    ) -> Self {
        Self {
            keys,
            store,
            limiter,
            base_url: base_url.into(),
            history_limit,
        }
    }

    /// Resolve credentials and build a client. Fails closed on auth,
    /// role, missing key, or malformed key.
    fn client_for(&self, user_id: &str) -> Result<Client<OpenAIConfig>> {
        let api_key = self.keys.get_api_key(user_id, SERVICE_OPENAI)?;
        if !api_key.starts_with("sk-") || api_key.len() < 40 {
            return Err(ChatError::InvalidKeyFormat);
        }
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.base_url);
        Ok(Client::with_config(config))
    }

    fn to_request_message(msg: &HistoryMessage) -> Result<ChatCompletionRequestMessage> {
        let request = match msg.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(vendor_err)?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(vendor_err)?
                .into(),
            Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(vendor_err)?
                .into(),
        };
        Ok(request)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn vendor(&self) -> Vendor {
        Vendor::OpenAi
    }

    async fn get_response(
        &self,
        message: &str,
        user_id: &str,
        session_id: &str,
        model_alias: Option<&str>,
        on_stream: Option<StreamCallback<'_>>,
    ) -> Result<Completion> {
        if !self.limiter.check() {
            return Err(ChatError::RateLimited);
        }

        let client = self.client_for(user_id)?;
        let history = self.conversation_history(session_id, self.history_limit)?;
        let model = models::model_id_for(model_alias);

        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(HistoryMessage::new(Role::System, SYSTEM_PROMPT));
        turns.extend(history);
        turns.push(HistoryMessage::new(Role::User, message));

        // Rough prompt size, reported with the first streamed chunk. The
        // vendor does not include usage on streamed completions.
        let prompt_estimate: u32 =
            (turns.iter().map(|t| t.content.len()).sum::<usize>() / 4) as u32;

        let messages = turns
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        self.limiter.record();
        debug!(model, session_id, streaming = on_stream.is_some(), "openai request");

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .build()
            .map_err(vendor_err)?;

        if let Some(on_stream) = on_stream {
            let mut stream = client
                .chat()
                .create_stream(request)
                .await
                .map_err(vendor_err)?;

            let mut full_response = String::new();
            let mut first_chunk = true;
            while let Some(result) = stream.next().await {
                let chunk = result.map_err(vendor_err)?;
                let Some(delta) = chunk
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.as_deref())
                else {
                    continue;
                };
                if delta.is_empty() {
                    continue;
                }
                full_response.push_str(delta);
                on_stream(delta, first_chunk.then_some(prompt_estimate));
                first_chunk = false;
            }

            Ok(Completion {
                text: full_response,
                usage: None,
            })
        } else {
            let response = client.chat().create(request).await.map_err(vendor_err)?;
            let text = response
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .unwrap_or_default();
            let usage = response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
            Ok(Completion {
                text,
                // Zeroes when the vendor omits counts.
                usage: Some(usage.unwrap_or_default()),
            })
        }
    }

    async fn validate_api_key(&self, user_id: &str) -> bool {
        let Ok(client) = self.client_for(user_id) else {
            return false;
        };
        let Ok(probe) = ChatCompletionRequestUserMessageArgs::default()
            .content("test")
            .build()
        else {
            return false;
        };
        let Ok(request) = CreateChatCompletionRequestArgs::default()
            .model(models::model_id_for(Some("gpt-4o")))
            .messages(vec![probe.into()])
            .max_tokens(1u32)
            .build()
        else {
            return false;
        };
        client.chat().create(request).await.is_ok()
    }

    fn conversation_history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryMessage>> {
        self.store.recent_history(session_id, limit)
    }
}

fn vendor_err(err: impl std::fmt::Display) -> ChatError {
    ChatError::Vendor(err.to_string())
}
