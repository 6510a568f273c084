//! Error taxonomy for the chat core.
//!
//! Every failure that can cross a component boundary is an explicit kind
//! here; the Display strings are the user-facing messages the UI shows in
//! its inline banner. Callers match on kinds, never on message text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// No authenticated session for the given user id.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Caller lacks the admin role needed for credential retrieval.
    #[error("Admin privileges required to access API key")]
    PermissionDenied,

    /// No key configured for the requested vendor service.
    #[error("{service} API key not found. Please set up your API key in the admin panel.")]
    KeyNotConfigured { service: String },

    /// Key is present but fails the vendor's shape check.
    #[error("Invalid API key format. Please check your API key.")]
    InvalidKeyFormat,

    /// Local sliding-window limit exhausted; no network call was made.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message is too long (maximum {max} characters)")]
    MessageTooLong { max: usize },

    #[error("Maximum message limit reached for this session. Please start a new session.")]
    SessionLimitReached,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Upstream API failure: HTTP errors, malformed responses, network.
    #[error("{0}")]
    Vendor(String),
}

impl ChatError {
    /// True for failures detected before any network traffic.
    pub fn is_local(&self) -> bool {
        !matches!(self, ChatError::Vendor(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
