//! Message types shared by the store, the provider adapters, and the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token accounting reported by a vendor for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A persisted chat message row. Immutable once written, except deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: String,
    pub user_id: String,
    pub content: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
    pub usage: Option<TokenUsage>,
}

/// Conversation role in vendor vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One history entry handed to a vendor API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Map a stored row to vendor vocabulary: bot rows are assistant turns.
    pub fn from_row(content: impl Into<String>, is_bot: bool) -> Self {
        Self {
            role: if is_bot { Role::Assistant } else { Role::User },
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mapping_from_row() {
        assert_eq!(HistoryMessage::from_row("hi", true).role, Role::Assistant);
        assert_eq!(HistoryMessage::from_row("hi", false).role, Role::User);
    }
}
