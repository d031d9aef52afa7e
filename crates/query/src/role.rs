//! Caller roles and identities

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller role, totally ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Unknown,
    Participant,
    Researcher,
    SystemAdmin,
}

impl Role {
    /// Callers at or above this role see every record of a resource.
    pub const RESEARCHER_THRESHOLD: Role = Role::Researcher;

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Participant => "participant",
            Role::Researcher => "researcher",
            Role::SystemAdmin => "system_admin",
        }
    }

    pub fn sees_all_records(&self) -> bool {
        *self >= Self::RESEARCHER_THRESHOLD
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "participant" => Role::Participant,
            "researcher" => Role::Researcher,
            "system_admin" | "admin" => Role::SystemAdmin,
            _ => Role::Unknown,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity and role of the current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}
