//! User records and the persistence seam.
//!
//! The auth core does not own a database: it reads and mutates user records
//! through the `UserStore` trait, and the document-database adapter lives
//! with the rest of the persistence layer. `MemoryUserStore` backs tests and
//! single-node development runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::Role;

/// Persisted identity, as stored by the external persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    pub active: bool,
    /// One-time password-reset credential, cleared on use.
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub reset_expires: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(username: &str, email: &str, password_hash: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            last_name: None,
            phone: None,
            specialty: None,
            active: true,
            reset_token: None,
            reset_expires: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is already taken")]
    Duplicate(String),
    #[error("user not found")]
    NotFound,
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// Operations the auth core needs from user persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn is_empty(&self) -> Result<bool, StoreError>;

    /// Insert a new record; usernames and emails are unique.
    async fn insert(&self, record: UserRecord) -> Result<UserRecord, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Replace an existing record wholesale (role/active/profile edits).
    async fn update(&self, record: UserRecord) -> Result<(), StoreError>;

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), StoreError>;

    async fn set_reset_token(
        &self,
        id: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn clear_reset_token(&self, id: &str) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// In-process store keyed by user id.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.users.read().is_empty())
    }

    async fn insert(&self, record: UserRecord) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write();
        if users.values().any(|u| u.username == record.username) {
            return Err(StoreError::Duplicate(format!(
                "username '{}'",
                record.username
            )));
        }
        if users.values().any(|u| u.email == record.email) {
            return Err(StoreError::Duplicate(format!("email '{}'", record.email)));
        }
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut all: Vec<UserRecord> = self.users.read().values().cloned().collect();
        all.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(all)
    }

    async fn update(&self, record: UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write();
        match users.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write();
        match users.get_mut(id) {
            Some(u) => {
                u.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn set_reset_token(
        &self,
        id: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write();
        match users.get_mut(id) {
            Some(u) => {
                u.reset_token = Some(token.to_string());
                u.reset_expires = Some(expires);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn clear_reset_token(&self, id: &str) -> Result<(), StoreError> {
        let mut users = self.users.write();
        match users.get_mut(id) {
            Some(u) => {
                u.reset_token = None;
                u.reset_expires = None;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().remove(id).is_some())
    }
}
