//! Message Store: creation and listing for both delivery channels.
//!
//! Every timestamp and id is assigned here. Callers never supply them, which
//! keeps `created_at` ordering trustworthy.

use tracing::{info, warn};
use uuid::Uuid;

use pulse_types::models::{Account, Broadcast, BroadcastView, Category, DirectMessage, Role};

use crate::Database;
use crate::error::{DeliveryError, Result};
use crate::models::{BroadcastRow, DirectMessageRow, format_timestamp, now};
use crate::queries;

/// Longest accepted body, in characters.
pub const MAX_BODY_CHARS: usize = 4000;

/// Check a body/category pair and return the trimmed body with the parsed
/// category.
fn validate(body: &str, category: &str) -> Result<(String, Category)> {
    let body = body.trim();
    if body.is_empty() {
        return Err(DeliveryError::Validation("body must not be empty".into()));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(DeliveryError::Validation(format!(
            "body exceeds {} characters",
            MAX_BODY_CHARS
        )));
    }
    let category = category
        .parse::<Category>()
        .map_err(|e| DeliveryError::Validation(e.to_string()))?;
    Ok((body.to_string(), category))
}

impl Database {
    // -- Accounts --

    /// Provision an account, or change the role of an existing one.
    pub fn upsert_account(&self, id: Uuid, role: Role) -> Result<Account> {
        let id = id.to_string();
        let row = self.with_conn_mut(|conn| {
            queries::upsert_account(conn, &id, role.as_str(), &format_timestamp(now()))?;
            queries::query_account(conn, &id)
        })?;
        let row = row.ok_or_else(|| anyhow::anyhow!("account {} vanished after upsert", id))?;
        Ok(row.try_into()?)
    }

    pub fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let row = self.with_conn(|conn| queries::query_account(conn, &id.to_string()))?;
        Ok(row.map(Account::try_from).transpose()?)
    }

    // -- Direct messages --

    /// Store a role-to-role message. The target is always the role opposite
    /// the sender, and the message starts unread.
    pub fn create_direct_message(
        &self,
        sender_id: Uuid,
        sender_role: Role,
        body: &str,
        category: &str,
    ) -> Result<DirectMessage> {
        let (body, category) = validate(body, category)?;

        let message = DirectMessage {
            id: Uuid::new_v4(),
            sender_id,
            sender_role,
            target_role: sender_role.opposite(),
            body,
            category,
            created_at: now(),
            read: false,
        };

        let row = DirectMessageRow {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            sender_role: message.sender_role.as_str().to_string(),
            target_role: message.target_role.as_str().to_string(),
            body: message.body.clone(),
            category: message.category.as_str().to_string(),
            created_at: format_timestamp(message.created_at),
            read: false,
        };
        self.with_conn_mut(|conn| queries::insert_direct_message(conn, &row))?;

        info!(
            "Direct message {} from {} ({}) to role {}",
            message.id, sender_id, sender_role, message.target_role
        );
        Ok(message)
    }

    /// Messages addressed to `role` and messages sent by `role`, newest first.
    pub fn list_direct_messages_for_role(&self, role: Role) -> Result<Vec<DirectMessage>> {
        let rows = self.with_conn(|conn| queries::query_direct_messages_for_role(conn, role.as_str()))?;
        let messages = rows
            .into_iter()
            .map(DirectMessage::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(messages)
    }

    // -- Broadcasts --

    /// Store an announcement. The author must resolve to an Admin account;
    /// nothing is written otherwise.
    pub fn create_broadcast(&self, author_id: Uuid, body: &str, category: &str) -> Result<Broadcast> {
        let (body, category) = validate(body, category)?;

        let broadcast = Broadcast {
            id: Uuid::new_v4(),
            author_id,
            body,
            category,
            created_at: now(),
        };
        let row = BroadcastRow {
            id: broadcast.id.to_string(),
            author_id: author_id.to_string(),
            body: broadcast.body.clone(),
            category: broadcast.category.as_str().to_string(),
            created_at: format_timestamp(broadcast.created_at),
        };

        self.with_conn_mut(|conn| -> Result<()> {
            let author = queries::query_account(conn, &row.author_id)?
                .map(Account::try_from)
                .transpose()?;
            match author {
                Some(account) if account.role == Role::Admin => {}
                Some(account) => {
                    warn!("Broadcast rejected: account {} has role {}", account.id, account.role);
                    return Err(DeliveryError::Authorization(
                        "only admin accounts may send broadcasts".into(),
                    ));
                }
                None => {
                    warn!("Broadcast rejected: unknown author {}", author_id);
                    return Err(DeliveryError::Authorization(
                        "broadcast author is not an admin account".into(),
                    ));
                }
            }
            queries::insert_broadcast(conn, &row)?;
            Ok(())
        })?;

        info!("Broadcast {} created by {}", broadcast.id, author_id);
        Ok(broadcast)
    }

    /// All broadcasts, newest first. No role filtering.
    pub fn list_broadcasts(&self) -> Result<Vec<Broadcast>> {
        let rows = self.with_conn(queries::query_broadcasts)?;
        let broadcasts = rows
            .into_iter()
            .map(Broadcast::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(broadcasts)
    }

    /// All broadcasts with this account's read state, newest first.
    pub fn list_broadcasts_for_account(&self, account_id: Uuid) -> Result<Vec<BroadcastView>> {
        let rows = self.with_conn(|conn| {
            queries::query_broadcasts_for_account(conn, &account_id.to_string())
        })?;
        let views = rows
            .into_iter()
            .map(BroadcastView::try_from)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(views)
    }
}
