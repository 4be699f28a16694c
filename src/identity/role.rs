use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of roles known to the clinic backend.
///
/// `Admin` is the designated override role: the authorization gate checks it
/// first, so adding a role never touches the comparison logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Satisfies any role requirement.
    Admin,
    Vet,
    Receptionist,
}

impl Role {
    /// The single role that passes every gate.
    pub const OVERRIDE: Role = Role::Admin;

    /// Parse a role from its stored string form (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "vet" => Some(Self::Vet),
            "receptionist" => Some(Self::Receptionist),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Vet => "vet",
            Self::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
