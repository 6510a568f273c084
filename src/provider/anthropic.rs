//! Anthropic Messages API adapter.
//!
//! Talks to the API over raw HTTP; streaming responses arrive as SSE lines
//! which are buffered and parsed frame by frame.

use super::{ChatProvider, Completion, StreamCallback};
use crate::credentials::{ApiKeyStore, SERVICE_ANTHROPIC};
use crate::error::{ChatError, Result};
use crate::message::{HistoryMessage, Role, TokenUsage};
use crate::models::{self, Vendor};
use crate::ratelimit::RateLimiter;
use crate::store::ConversationStore;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    keys: ApiKeyStore,
    store: ConversationStore,
    limiter: RateLimiter,
    base_url: String,
    history_limit: usize,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl WireMessage {
    /// The Messages API takes no system role; fold it into a user turn.
    fn from_history(msg: HistoryMessage) -> Self {
        Self {
            role: match msg.role {
                Role::Assistant => "assistant",
                Role::User | Role::System => "user",
            },
            content: msg.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    text: Option<String>,
}

impl AnthropicProvider {
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
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_messages(&self, api_key: &str, body: &MessagesRequest<'_>) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ChatError::Vendor(format!("API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Vendor(format!("API error {status}: {text}")));
        }
        Ok(response)
    }

    async fn stream_messages(
        &self,
        api_key: &str,
        body: &MessagesRequest<'_>,
        on_stream: StreamCallback<'_>,
    ) -> Result<String> {
        let response = self.post_messages(api_key, body).await?;
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut full_response = String::new();

        while let Some(result) = stream.next().await {
            let bytes = result.map_err(|e| ChatError::Vendor(format!("Stream read error: {e}")))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            // Process complete SSE lines; partial frames stay buffered.
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer = buffer[pos + 1..].to_string();

                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };

                let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
                    continue;
                };
                if event.kind == "message_stop" {
                    return Ok(full_response);
                }
                if event.kind == "content_block_delta" {
                    if let Some(text) = event.delta.and_then(|d| d.text) {
                        if !text.is_empty() {
                            full_response.push_str(&text);
                            on_stream(&text, None);
                        }
                    }
                }
            }
        }

        Ok(full_response)
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn vendor(&self) -> Vendor {
        Vendor::Anthropic
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

        let api_key = self.keys.get_api_key(user_id, SERVICE_ANTHROPIC)?;
        let history = self.conversation_history(session_id, self.history_limit)?;
        let model = models::model_id_for(model_alias);

        let mut messages: Vec<WireMessage> =
            history.into_iter().map(WireMessage::from_history).collect();
        messages.push(WireMessage {
            role: "user",
            content: message.to_string(),
        });

        self.limiter.record();
        debug!(model, session_id, streaming = on_stream.is_some(), "anthropic request");

        let body = MessagesRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages,
            stream: on_stream.is_some(),
        };

        if let Some(on_stream) = on_stream {
            let text = self.stream_messages(&api_key, &body, on_stream).await?;
            Ok(Completion { text, usage: None })
        } else {
            let response = self.post_messages(&api_key, &body).await?;
            let parsed: MessagesResponse = response
                .json()
                .await
                .map_err(|e| ChatError::Vendor(format!("Malformed API response: {e}")))?;
            let text = parsed
                .content
                .first()
                .map(|block| block.text.clone())
                .unwrap_or_default();
            let usage = parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            });
            Ok(Completion {
                text,
                usage: Some(usage.unwrap_or_default()),
            })
        }
    }

    async fn validate_api_key(&self, user_id: &str) -> bool {
        let Ok(api_key) = self.keys.get_api_key(user_id, SERVICE_ANTHROPIC) else {
            return false;
        };
        let body = MessagesRequest {
            model: models::model_id_for(Some("claude-3-5-haiku-latest")),
            max_tokens: 1,
            messages: vec![WireMessage {
                role: "user",
                content: "test".to_string(),
            }],
            stream: false,
        };
        self.post_messages(&api_key, &body).await.is_ok()
    }

    fn conversation_history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryMessage>> {
        self.store.recent_history(session_id, limit)
    }
}
