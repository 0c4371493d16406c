//! Read-State Tracker. Read flags only ever move from unread to read, and
//! every mark operation is idempotent.

use tracing::{debug, warn};
use uuid::Uuid;

use pulse_types::models::{DirectMessage, ReadReceipt, Role};

use crate::Database;
use crate::error::{DeliveryError, Result};
use crate::models::{format_timestamp, now};
use crate::queries;

impl Database {
    /// Acknowledge a direct message on behalf of its receiving role. Returns
    /// the message as stored after the update.
    pub fn mark_direct_message_read(&self, message_id: Uuid, caller_role: Role) -> Result<DirectMessage> {
        let id = message_id.to_string();
        let row = self.with_conn_mut(|conn| -> Result<_> {
            let Some(row) = queries::query_direct_message(conn, &id)? else {
                return Err(DeliveryError::NotFound(format!("direct message {}", id)));
            };
            let message = DirectMessage::try_from(row)?;
            if !message.is_addressed_to(caller_role) {
                warn!(
                    "Role {} tried to acknowledge message {} addressed to {}",
                    caller_role, id, message.target_role
                );
                return Err(DeliveryError::Authorization(
                    "only the receiving role may acknowledge a message".into(),
                ));
            }
            if queries::set_direct_message_read(conn, &id)? == 0 {
                debug!("Direct message {} already read", id);
            }
            Ok(DirectMessage { read: true, ..message })
        })?;
        Ok(row)
    }

    /// Record that `account_id` has read a broadcast. Repeating the call is
    /// a no-op that returns the original receipt.
    pub fn mark_broadcast_read(&self, broadcast_id: Uuid, account_id: Uuid) -> Result<ReadReceipt> {
        let bid = broadcast_id.to_string();
        let aid = account_id.to_string();
        self.with_conn_mut(|conn| -> Result<_> {
            if !queries::broadcast_exists(conn, &bid)? {
                return Err(DeliveryError::NotFound(format!("broadcast {}", bid)));
            }
            queries::upsert_receipt(conn, &bid, &aid, &format_timestamp(now()))?;
            let row = queries::query_receipt(conn, &bid, &aid)?
                .ok_or_else(|| anyhow::anyhow!("receipt for {} vanished after upsert", bid))?;
            Ok(ReadReceipt::try_from(row)?)
        })
    }

    /// Badge counter: unread direct messages addressed to `caller_role` plus
    /// broadcasts `account_id` has not read. Pure query, derived on every
    /// call.
    pub fn compute_unread_count(&self, caller_role: Role, account_id: Uuid) -> Result<u64> {
        let count = self.with_conn(|conn| {
            queries::count_unread(conn, caller_role.as_str(), &account_id.to_string())
        })?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_types::models::Account;

    struct Fixture {
        db: Database,
        admin: Account,
        alice: Account,
        bob: Account,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let admin = db.upsert_account(Uuid::new_v4(), Role::Admin).unwrap();
        let alice = db.upsert_account(Uuid::new_v4(), Role::Standard).unwrap();
        let bob = db.upsert_account(Uuid::new_v4(), Role::Standard).unwrap();
        Fixture { db, admin, alice, bob }
    }

    /// Unread items the caller would find by listing everything and
    /// filtering client-side.
    fn unread_by_listing(db: &Database, account: &Account) -> u64 {
        let direct = db
            .list_direct_messages_for_role(account.role)
            .unwrap()
            .into_iter()
            .filter(|m| m.is_addressed_to(account.role) && !m.read)
            .count();
        let broadcasts = db
            .list_broadcasts_for_account(account.id)
            .unwrap()
            .into_iter()
            .filter(|b| !b.is_read)
            .count();
        (direct + broadcasts) as u64
    }

    #[test]
    fn only_receiving_role_may_acknowledge() {
        let f = fixture();
        let message = f
            .db
            .create_direct_message(f.alice.id, Role::Standard, "Need access to the budget tab", "info")
            .unwrap();

        let err = f.db.mark_direct_message_read(message.id, Role::Standard).unwrap_err();
        assert!(matches!(err, DeliveryError::Authorization(_)));
        assert!(!f.db.list_direct_messages_for_role(Role::Admin).unwrap()[0].read);

        let updated = f.db.mark_direct_message_read(message.id, Role::Admin).unwrap();
        assert!(updated.read);
        assert_eq!(updated.id, message.id);
    }

    #[test]
    fn direct_read_is_idempotent_and_shared() {
        let f = fixture();
        let message = f
            .db
            .create_direct_message(f.admin.id, Role::Admin, "Upload your innovation proposals", "info")
            .unwrap();

        let first = f.db.mark_direct_message_read(message.id, Role::Standard).unwrap();
        let second = f.db.mark_direct_message_read(message.id, Role::Standard).unwrap();
        assert_eq!(first, second);

        // One flag per message: every standard account now sees it read
        for account in [&f.alice, &f.bob] {
            assert_eq!(f.db.compute_unread_count(account.role, account.id).unwrap(), 0);
        }
    }

    #[test]
    fn marking_unknown_message_fails() {
        let f = fixture();
        let err = f.db.mark_direct_message_read(Uuid::new_v4(), Role::Admin).unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound(_)));
    }

    #[test]
    fn broadcast_receipts_are_per_account() {
        let f = fixture();
        let broadcast = f
            .db
            .create_broadcast(f.admin.id, "Maintenance tonight", "warning")
            .unwrap();

        let receipt = f.db.mark_broadcast_read(broadcast.id, f.alice.id).unwrap();
        assert!(receipt.read);
        assert_eq!(receipt.account_id, f.alice.id);

        let alice_view = f.db.list_broadcasts_for_account(f.alice.id).unwrap();
        let bob_view = f.db.list_broadcasts_for_account(f.bob.id).unwrap();
        assert!(alice_view[0].is_read);
        assert_eq!(alice_view[0].read_at, Some(receipt.read_at));
        assert!(!bob_view[0].is_read);
        assert!(bob_view[0].read_at.is_none());
    }

    #[test]
    fn repeated_broadcast_read_keeps_first_receipt() {
        let f = fixture();
        let broadcast = f.db.create_broadcast(f.admin.id, "Audit next week", "urgent").unwrap();

        let first = f.db.mark_broadcast_read(broadcast.id, f.bob.id).unwrap();
        let second = f.db.mark_broadcast_read(broadcast.id, f.bob.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(f.db.with_conn(queries::count_receipts).unwrap(), 1);
    }

    #[test]
    fn unknown_broadcast_creates_no_receipt() {
        let f = fixture();
        let err = f.db.mark_broadcast_read(Uuid::new_v4(), f.alice.id).unwrap_err();
        assert!(matches!(err, DeliveryError::NotFound(_)));
        assert_eq!(f.db.with_conn(queries::count_receipts).unwrap(), 0);
    }

    #[test]
    fn read_flags_cannot_be_cleared_in_storage() {
        let f = fixture();
        let message = f
            .db
            .create_direct_message(f.alice.id, Role::Standard, "Report attached", "success")
            .unwrap();
        f.db.mark_direct_message_read(message.id, Role::Admin).unwrap();

        let id = message.id.to_string();
        let cleared = f.db.with_conn(|conn| {
            Ok::<_, anyhow::Error>(conn.execute("UPDATE direct_messages SET read = 0 WHERE id = ?1", [&id])?)
        });
        assert!(cleared.is_err());
        assert!(f.db.list_direct_messages_for_role(Role::Admin).unwrap()[0].read);
    }

    #[test]
    fn unread_count_matches_listing() {
        let f = fixture();
        let b1 = f.db.create_broadcast(f.admin.id, "Targets updated", "info").unwrap();
        f.db.create_broadcast(f.admin.id, "Server move", "warning").unwrap();
        let m1 = f
            .db
            .create_direct_message(f.alice.id, Role::Standard, "Hours submitted", "success")
            .unwrap();
        f.db.create_direct_message(f.bob.id, Role::Standard, "Question on budget", "info")
            .unwrap();
        f.db.create_direct_message(f.admin.id, Role::Admin, "Thanks all", "info")
            .unwrap();

        f.db.mark_broadcast_read(b1.id, f.alice.id).unwrap();
        f.db.mark_direct_message_read(m1.id, Role::Admin).unwrap();

        for account in [&f.admin, &f.alice, &f.bob] {
            let derived = f.db.compute_unread_count(account.role, account.id).unwrap();
            assert_eq!(derived, unread_by_listing(&f.db, account), "account {}", account.id);
        }
        // admin: 1 direct + 2 broadcasts, alice: 1 direct + 1 broadcast
        assert_eq!(f.db.compute_unread_count(Role::Admin, f.admin.id).unwrap(), 3);
        assert_eq!(f.db.compute_unread_count(Role::Standard, f.alice.id).unwrap(), 2);
        assert_eq!(f.db.compute_unread_count(Role::Standard, f.bob.id).unwrap(), 3);
    }
}
