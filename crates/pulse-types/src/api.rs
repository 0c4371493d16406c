use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

// -- JWT Claims --

/// Bearer token claims. Issued by the identity system; `role` is advisory,
/// the stored account role is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

// -- Direct messages --

/// Sender identity, id, timestamp and read state are all assigned by the
/// server, so any such field in the body is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendDirectMessageRequest {
    pub body: String,
    pub category: String,
}

// -- Broadcasts --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendBroadcastRequest {
    pub body: String,
    pub category: String,
}

// -- Read state --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread: u64,
}
