use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two role classes that exchange direct messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Standard,
}

impl Role {
    /// The role class on the receiving side of a message sent by `self`.
    pub fn opposite(self) -> Self {
        match self {
            Self::Admin => Self::Standard,
            Self::Standard => Self::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "standard" => Ok(Self::Standard),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Display category shared by direct messages and broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Info,
    Warning,
    Success,
    Urgent,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Info, Self::Warning, Self::Success, Self::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("category", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind} {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// An authenticated caller. Provisioned by the identity system; never
/// mutated by message delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A role-to-role note. One shared `read` flag covers every account of
/// `target_role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_role: Role,
    pub target_role: Role,
    pub body: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl DirectMessage {
    /// True if accounts of `role` are the receivers of this message.
    pub fn is_addressed_to(&self, role: Role) -> bool {
        self.target_role == role
    }
}

/// An admin-authored announcement visible to every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

/// A broadcast as seen by one account, with that account's read state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastView {
    #[serde(flatten)]
    pub broadcast: Broadcast,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// Per-account acknowledgement of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub broadcast_id: Uuid,
    pub account_id: Uuid,
    pub read: bool,
    pub read_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_role_never_matches_sender() {
        for role in [Role::Admin, Role::Standard] {
            assert_ne!(role.opposite(), role);
            assert_eq!(role.opposite().opposite(), role);
        }
    }

    #[test]
    fn category_parses_only_known_values() {
        assert_eq!("warning".parse::<Category>(), Ok(Category::Warning));
        assert_eq!("urgent".parse::<Category>(), Ok(Category::Urgent));
        let err = "critical".parse::<Category>().unwrap_err();
        assert_eq!(err.kind, "category");
        assert!("Info".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn broadcast_view_serializes_flat() {
        let view = BroadcastView {
            broadcast: Broadcast {
                id: Uuid::nil(),
                author_id: Uuid::nil(),
                body: "Maintenance tonight".into(),
                category: Category::Warning,
                created_at: DateTime::default(),
            },
            is_read: false,
            read_at: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["body"], "Maintenance tonight");
        assert_eq!(json["category"], "warning");
        assert_eq!(json["is_read"], false);
    }
}
