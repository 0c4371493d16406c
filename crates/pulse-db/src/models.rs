//! Database row types. These map directly to SQLite rows and stay separate
//! from the pulse-types models so the storage layer owns its encoding.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use uuid::Uuid;

use pulse_types::models::{Account, Broadcast, BroadcastView, DirectMessage, ReadReceipt};

pub struct AccountRow {
    pub id: String,
    pub role: String,
    pub created_at: String,
}

pub struct DirectMessageRow {
    pub id: String,
    pub sender_id: String,
    pub sender_role: String,
    pub target_role: String,
    pub body: String,
    pub category: String,
    pub created_at: String,
    pub read: bool,
}

pub struct BroadcastRow {
    pub id: String,
    pub author_id: String,
    pub body: String,
    pub category: String,
    pub created_at: String,
}

/// A broadcast outer-joined with one account's receipt. Missing receipt
/// columns come back as NULL.
pub struct BroadcastViewRow {
    pub broadcast: BroadcastRow,
    pub read: Option<bool>,
    pub read_at: Option<String>,
}

pub struct ReceiptRow {
    pub broadcast_id: String,
    pub account_id: String,
    pub read: bool,
    pub read_at: Option<String>,
}

/// Current time at storage precision, so a value handed back to a caller
/// compares equal to the same value read from the database later.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Server-side timestamp encoding. Fixed-width UTC with microseconds, so
/// lexical order in SQLite equals chronological order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("corrupt timestamp '{}'", s))?
        .with_timezone(&Utc))
}

fn parse_uuid(s: &str, column: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("corrupt {} '{}'", column, s))
}

impl TryFrom<AccountRow> for Account {
    type Error = anyhow::Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Account {
            id: parse_uuid(&row.id, "account id")?,
            role: row.role.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<DirectMessageRow> for DirectMessage {
    type Error = anyhow::Error;

    fn try_from(row: DirectMessageRow) -> Result<Self> {
        Ok(DirectMessage {
            id: parse_uuid(&row.id, "message id")?,
            sender_id: parse_uuid(&row.sender_id, "sender_id")?,
            sender_role: row.sender_role.parse()?,
            target_role: row.target_role.parse()?,
            body: row.body,
            category: row.category.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
            read: row.read,
        })
    }
}

impl TryFrom<BroadcastRow> for Broadcast {
    type Error = anyhow::Error;

    fn try_from(row: BroadcastRow) -> Result<Self> {
        Ok(Broadcast {
            id: parse_uuid(&row.id, "broadcast id")?,
            author_id: parse_uuid(&row.author_id, "author_id")?,
            body: row.body,
            category: row.category.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<BroadcastViewRow> for BroadcastView {
    type Error = anyhow::Error;

    fn try_from(row: BroadcastViewRow) -> Result<Self> {
        Ok(BroadcastView {
            broadcast: row.broadcast.try_into()?,
            // No receipt row means unread
            is_read: row.read.unwrap_or(false),
            read_at: row.read_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

impl TryFrom<ReceiptRow> for ReadReceipt {
    type Error = anyhow::Error;

    fn try_from(row: ReceiptRow) -> Result<Self> {
        let read_at = row
            .read_at
            .as_deref()
            .context("receipt without read_at")
            .and_then(parse_timestamp)?;
        Ok(ReadReceipt {
            broadcast_id: parse_uuid(&row.broadcast_id, "broadcast_id")?,
            account_id: parse_uuid(&row.account_id, "account_id")?,
            read: row.read,
            read_at,
        })
    }
}
