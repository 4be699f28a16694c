use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::store::UserRecord;

/// Request-scoped projection of a stored user.
///
/// Built fresh from the persisted record on every request and discarded at
/// request end. Never carries the password hash or reset-token fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    pub active: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&UserRecord> for Principal {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            role: record.role,
            last_name: record.last_name.clone(),
            phone: record.phone.clone(),
            specialty: record.specialty.clone(),
            active: record.active,
        }
    }
}
