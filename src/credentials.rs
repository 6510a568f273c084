//! Privileged vendor credential retrieval.
//!
//! `get_api_key` is the single chokepoint for secrets: it fails closed with a
//! distinct error kind for each way it can refuse, so adapters branch on the
//! kind rather than sniffing message text.

use crate::auth::UserDirectory;
use crate::error::{ChatError, Result};
use crate::store::Database;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tracing::warn;

/// Service names accepted by the key store.
pub const SERVICE_OPENAI: &str = "openai";
pub const SERVICE_ANTHROPIC: &str = "anthropic";

#[derive(Clone)]
pub struct ApiKeyStore {
    db: Arc<Database>,
    users: UserDirectory,
}

impl ApiKeyStore {
    pub fn new(db: Arc<Database>, users: UserDirectory) -> Self {
        Self { db, users }
    }

    /// Store a key for a vendor service. Admin-only, like retrieval.
    pub fn set_api_key(&self, user_id: &str, service: &str, key: &str) -> Result<()> {
        self.users.require_user(user_id)?;
        if !self.users.is_admin(user_id)? {
            return Err(ChatError::PermissionDenied);
        }
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO api_keys (service, key) VALUES (?1, ?2)",
                params![service, key],
            )?;
            Ok(())
        })
    }

    /// Retrieve the key for `service` on behalf of `user_id`.
    ///
    /// Fails closed: unknown user, missing admin role, and unconfigured key
    /// each map to their own [`ChatError`] kind.
    pub fn get_api_key(&self, user_id: &str, service: &str) -> Result<String> {
        self.users.require_user(user_id)?;
        if !self.users.is_admin(user_id)? {
            warn!(user_id, service, "non-admin attempted API key retrieval");
            return Err(ChatError::PermissionDenied);
        }

        let key = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT key FROM api_keys WHERE service = ?1",
                params![service],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })?;

        key.ok_or_else(|| ChatError::KeyNotConfigured {
            service: display_name(service).to_string(),
        })
    }
}

fn display_name(service: &str) -> &str {
    match service {
        SERVICE_OPENAI => "OpenAI",
        SERVICE_ANTHROPIC => "Anthropic",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ROLE_ADMIN;

    fn fixture() -> ApiKeyStore {
        let db = Database::open_in_memory().unwrap();
        let users = UserDirectory::new(db.clone());
        users.add_user("admin", None).unwrap();
        users.set_role("admin", ROLE_ADMIN).unwrap();
        users.add_user("member", None).unwrap();
        ApiKeyStore::new(db, users)
    }

    #[test]
    fn test_unknown_user_fails_authentication() {
        let keys = fixture();
        assert!(matches!(
            keys.get_api_key("ghost", SERVICE_OPENAI),
            Err(ChatError::AuthenticationRequired)
        ));
    }

    #[test]
    fn test_non_admin_is_denied() {
        let keys = fixture();
        assert!(matches!(
            keys.get_api_key("member", SERVICE_OPENAI),
            Err(ChatError::PermissionDenied)
        ));
        assert!(matches!(
            keys.set_api_key("member", SERVICE_OPENAI, "sk-x"),
            Err(ChatError::PermissionDenied)
        ));
    }

    #[test]
    fn test_missing_key_reports_service_name() {
        let keys = fixture();
        let err = keys.get_api_key("admin", SERVICE_ANTHROPIC).unwrap_err();
        assert!(err.to_string().contains("Anthropic API key not found"));
    }

    #[test]
    fn test_set_then_get() {
        let keys = fixture();
        keys.set_api_key("admin", SERVICE_OPENAI, "sk-test-key")
            .unwrap();
        assert_eq!(
            keys.get_api_key("admin", SERVICE_OPENAI).unwrap(),
            "sk-test-key"
        );
    }
}
