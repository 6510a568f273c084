//! slipspace-chat - multi-provider AI chat core
//!
//! This crate provides:
//! - Uniform adapters over the OpenAI and Anthropic chat APIs, with
//!   streaming, per-adapter rate limiting, and fail-closed credentials
//! - A sqlite-backed conversation store with per-session limits
//! - A chat orchestrator that reconciles optimistic UI state with
//!   eventually-written rows

pub mod auth;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod error;
pub mod message;
pub mod models;
pub mod provider;
pub mod ratelimit;
pub mod store;
pub mod transcript;

pub use auth::UserDirectory;
pub use chat::{ChatService, SendOutcome};
pub use config::{ChatConfig, ChatLimits, RateLimitConfig};
pub use credentials::ApiKeyStore;
pub use error::ChatError;
pub use message::{ChatMessage, HistoryMessage, Role, TokenUsage};
pub use models::{ModelDescriptor, Vendor, CATALOG};
pub use provider::{
    AnthropicProvider, ChatProvider, Completion, OpenAiProvider, ProviderFactory,
    ProviderSelector, StreamCallback,
};
pub use ratelimit::RateLimiter;
pub use store::{ConversationStore, Database, NewMessage};
pub use transcript::{Transcript, TranscriptEntry};
