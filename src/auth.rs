//! Authenticated-user and role boundary.
//!
//! Every privileged operation requires a known user id; an unknown id is a
//! hard failure, never a silent anonymous mode. Roles gate credential
//! retrieval: only `admin` may read vendor API keys.

use crate::error::{ChatError, Result};
use crate::store::Database;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

pub const ROLE_ADMIN: &str = "admin";

/// User registry backed by the shared datastore.
#[derive(Clone)]
pub struct UserDirectory {
    db: Arc<Database>,
}

impl UserDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register a user (the managed auth service does this upstream;
    /// the binary and tests seed through here).
    pub fn add_user(&self, user_id: &str, email: Option<&str>) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users (id, email) VALUES (?1, ?2)",
                params![user_id, email],
            )?;
            Ok(())
        })
    }

    pub fn set_role(&self, user_id: &str, role: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                params![user_id, role],
            )?;
            Ok(())
        })
    }

    /// Fail closed when the id does not belong to an authenticated session.
    pub fn require_user(&self, user_id: &str) -> Result<()> {
        let known = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![user_id],
                |_| Ok(()),
            )
            .optional()
        })?;
        match known {
            Some(()) => Ok(()),
            None => Err(ChatError::AuthenticationRequired),
        }
    }

    pub fn is_admin(&self, user_id: &str) -> Result<bool> {
        let role = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT role FROM user_roles WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })?;
        Ok(role.as_deref() == Some(ROLE_ADMIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        UserDirectory::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_unknown_user_is_rejected() {
        let dir = directory();
        assert!(matches!(
            dir.require_user("ghost"),
            Err(ChatError::AuthenticationRequired)
        ));
    }

    #[test]
    fn test_known_user_passes() {
        let dir = directory();
        dir.add_user("u1", Some("u1@example.com")).unwrap();
        dir.require_user("u1").unwrap();
    }

    #[test]
    fn test_admin_role() {
        let dir = directory();
        dir.add_user("u1", None).unwrap();
        assert!(!dir.is_admin("u1").unwrap());
        dir.set_role("u1", ROLE_ADMIN).unwrap();
        assert!(dir.is_admin("u1").unwrap());
    }
}
