//! Chat orchestration.
//!
//! The single entry point the presentation layer calls. Validates outbound
//! text, enforces the per-session cap, persists the user turn, drives the
//! selected provider adapter, and persists the assistant reply. Errors never
//! escape this layer as panics or raw `Err`s: every failure collapses into a
//! [`SendOutcome`] carrying a displayable string.
//!
//! The user message is written before the vendor call on purpose: a vendor
//! failure leaves a durable, unanswered user turn in the log. Callers must
//! tolerate that dangling turn; there is no rollback and no automatic retry.

use crate::config::ChatLimits;
use crate::error::{ChatError, Result};
use crate::message::ChatMessage;
use crate::provider::{ProviderSelector, StreamCallback};
use crate::store::{ConversationStore, NewMessage};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// UI-facing result of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SendOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(err: &ChatError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
        }
    }
}

pub struct ChatService {
    store: ConversationStore,
    providers: Arc<dyn ProviderSelector>,
    limits: ChatLimits,
}

impl ChatService {
    pub fn new(
        store: ConversationStore,
        providers: Arc<dyn ProviderSelector>,
        limits: ChatLimits,
    ) -> Self {
        Self {
            store,
            providers,
            limits,
        }
    }

    /// Run one full chat turn. See the module docs for ordering guarantees.
    pub async fn send_message(
        &self,
        content: &str,
        user_id: &str,
        session_id: &str,
        on_stream: Option<StreamCallback<'_>>,
        model: Option<&str>,
    ) -> SendOutcome {
        match self
            .send_inner(content, user_id, session_id, on_stream, model)
            .await
        {
            Ok(()) => SendOutcome::ok(),
            Err(err) => {
                warn!(session_id, error = %err, "send_message failed");
                SendOutcome::failed(&err)
            }
        }
    }

    async fn send_inner(
        &self,
        content: &str,
        user_id: &str,
        session_id: &str,
        on_stream: Option<StreamCallback<'_>>,
        model: Option<&str>,
    ) -> Result<()> {
        // Validation happens before any I/O.
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if content.chars().count() > self.limits.max_message_chars {
            return Err(ChatError::MessageTooLong {
                max: self.limits.max_message_chars,
            });
        }
        if self.store.session_message_count(session_id)? >= self.limits.max_session_messages {
            return Err(ChatError::SessionLimitReached);
        }

        // User turn first: durable even if the vendor call fails below.
        self.store.insert_message(NewMessage {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            is_bot: false,
            usage: None,
        })?;

        let provider = self.providers.get(model);
        let completion = provider
            .get_response(content, user_id, session_id, model, on_stream)
            .await?;

        self.store.insert_message(NewMessage {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            content: completion.text,
            is_bot: true,
            usage: completion.usage,
        })?;

        info!(session_id, "chat turn completed");
        Ok(())
    }

    /// Session transcript, ascending by creation time, scoped to the owner.
    pub fn session_messages(&self, session_id: &str, user_id: &str) -> Result<Vec<ChatMessage>> {
        self.store.session_messages(session_id, user_id)
    }

    pub fn delete_message(&self, message_id: Uuid, user_id: &str) -> SendOutcome {
        match self.store.delete_message(message_id, user_id) {
            Ok(()) => SendOutcome::ok(),
            Err(err) => SendOutcome::failed(&err),
        }
    }

    pub fn delete_session(&self, session_id: &str, user_id: &str) -> SendOutcome {
        match self.store.delete_session(session_id, user_id) {
            Ok(()) => SendOutcome::ok(),
            Err(err) => SendOutcome::failed(&err),
        }
    }

    pub fn delete_chat_history(&self, user_id: &str) -> SendOutcome {
        match self.store.delete_chat_history(user_id) {
            Ok(()) => SendOutcome::ok(),
            Err(err) => SendOutcome::failed(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HistoryMessage;
    use crate::models::Vendor;
    use crate::provider::{ChatProvider, Completion};
    use crate::store::Database;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider double: replies with fixed chunks or fails, and counts calls.
    struct StubProvider {
        chunks: Vec<&'static str>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn replying(chunks: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                chunks,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                chunks: vec![],
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatProvider for StubProvider {
        fn vendor(&self) -> Vendor {
            Vendor::OpenAi
        }

        async fn get_response(
            &self,
            _message: &str,
            _user_id: &str,
            _session_id: &str,
            _model_alias: Option<&str>,
            on_stream: Option<StreamCallback<'_>>,
        ) -> crate::error::Result<Completion> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ChatError::Vendor("vendor exploded".to_string()));
            }
            let mut text = String::new();
            let mut first = true;
            if let Some(on_stream) = on_stream {
                for chunk in &self.chunks {
                    text.push_str(chunk);
                    on_stream(chunk, first.then_some(7));
                    first = false;
                }
            } else {
                text = self.chunks.concat();
            }
            Ok(Completion { text, usage: None })
        }

        async fn validate_api_key(&self, _user_id: &str) -> bool {
            true
        }

        fn conversation_history(
            &self,
            _session_id: &str,
            _limit: usize,
        ) -> crate::error::Result<Vec<HistoryMessage>> {
            Ok(vec![])
        }
    }

    struct StubSelector(Arc<StubProvider>);

    impl ProviderSelector for StubSelector {
        fn get(&self, _model_alias: Option<&str>) -> Arc<dyn ChatProvider> {
            self.0.clone()
        }
    }

    fn service(provider: Arc<StubProvider>) -> (ChatService, ConversationStore) {
        let store = ConversationStore::new(Database::open_in_memory().unwrap());
        let service = ChatService::new(
            store.clone(),
            Arc::new(StubSelector(provider)),
            ChatLimits::default(),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_io() {
        let provider = StubProvider::replying(vec!["x"]);
        let (service, store) = service(provider.clone());

        let outcome = service.send_message("", "u1", "s1", None, None).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Message cannot be empty"));
        assert_eq!(provider.calls(), 0);
        assert!(store.session_messages("s1", "u1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlong_message_rejected_without_io() {
        let provider = StubProvider::replying(vec!["x"]);
        let (service, store) = service(provider.clone());

        let long = "a".repeat(501);
        let outcome = service.send_message(&long, "u1", "s1", None, None).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("too long"));
        assert_eq!(provider.calls(), 0);
        assert!(store.session_messages("s1", "u1").unwrap().is_empty());

        // Exactly at the limit is fine.
        let max = "a".repeat(500);
        let outcome = service.send_message(&max, "u1", "s1", None, None).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_session_cap_blocks_further_writes() {
        let provider = StubProvider::replying(vec!["x"]);
        let (service, store) = service(provider.clone());

        for _ in 0..25 {
            let outcome = service.send_message("hi", "u1", "s1", None, None).await;
            assert!(outcome.success);
        }
        // 25 turns x 2 rows = the 50-row cap.
        assert_eq!(store.session_message_count("s1").unwrap(), 50);

        let outcome = service.send_message("one more", "u1", "s1", None, None).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Maximum message limit"));
        assert_eq!(provider.calls(), 25);
        assert_eq!(store.session_message_count("s1").unwrap(), 50);
    }

    #[tokio::test]
    async fn test_hello_round_trip() {
        let provider = StubProvider::replying(vec!["Hi there!"]);
        let (service, store) = service(provider);

        let outcome = service.send_message("Hello", "U1", "S", None, None).await;
        assert!(outcome.success);

        let messages = store.session_messages("S", "U1").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Hello");
        assert!(!messages[0].is_bot);
        assert_eq!(messages[1].content, "Hi there!");
        assert!(messages[1].is_bot);
    }

    #[tokio::test]
    async fn test_streaming_chunks_reach_callback() {
        let provider = StubProvider::replying(vec!["Hi ", "the", "re!"]);
        let (service, store) = service(provider);

        let mut chunks: Vec<String> = Vec::new();
        let mut estimates: Vec<Option<u32>> = Vec::new();
        {
            let mut on_stream = |chunk: &str, usage: Option<u32>| {
                chunks.push(chunk.to_string());
                estimates.push(usage);
            };
            let outcome = service
                .send_message("Hello", "u1", "s1", Some(&mut on_stream), None)
                .await;
            assert!(outcome.success);
        }

        assert_eq!(chunks, vec!["Hi ", "the", "re!"]);
        // Prompt estimate rides only on the first chunk.
        assert_eq!(estimates, vec![Some(7), None, None]);

        let messages = store.session_messages("s1", "u1").unwrap();
        assert_eq!(messages[1].content, "Hi there!");
    }

    #[tokio::test]
    async fn test_vendor_failure_leaves_orphan_user_turn() {
        let provider = StubProvider::failing();
        let (service, store) = service(provider.clone());

        let outcome = service.send_message("Hello", "u1", "s1", None, None).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("vendor exploded"));
        assert_eq!(provider.calls(), 1);

        // The user turn is durable; no rollback.
        let messages = store.session_messages("s1", "u1").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hello");
        assert!(!messages[0].is_bot);
    }

    #[tokio::test]
    async fn test_delete_passthrough_is_idempotent() {
        let provider = StubProvider::replying(vec!["x"]);
        let (service, store) = service(provider);

        service.send_message("hi", "u1", "s1", None, None).await;
        let id = store.session_messages("s1", "u1").unwrap()[0].id;

        assert!(service.delete_message(id, "u1").success);
        assert!(service.delete_message(id, "u1").success);
        assert!(service.delete_session("s1", "u1").success);
        assert!(service.delete_chat_history("u1").success);
        assert!(service.session_messages("s1", "u1").unwrap().is_empty());
    }
}
