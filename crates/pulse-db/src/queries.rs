use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::models::{AccountRow, BroadcastRow, BroadcastViewRow, DirectMessageRow, ReceiptRow};

// -- Accounts --

/// Insert an account, or update its role if it already exists. The original
/// `created_at` is kept.
pub fn upsert_account(conn: &Connection, id: &str, role: &str, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, role, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET role = excluded.role",
        params![id, role, created_at],
    )?;
    Ok(())
}

pub fn query_account(conn: &Connection, id: &str) -> Result<Option<AccountRow>> {
    let row = conn
        .query_row(
            "SELECT id, role, created_at FROM accounts WHERE id = ?1",
            [id],
            |row| {
                Ok(AccountRow {
                    id: row.get(0)?,
                    role: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

// -- Direct messages --

const DIRECT_MESSAGE_COLUMNS: &str =
    "id, sender_id, sender_role, target_role, body, category, created_at, read";

fn direct_message_from_row(row: &Row<'_>) -> rusqlite::Result<DirectMessageRow> {
    Ok(DirectMessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_role: row.get(2)?,
        target_role: row.get(3)?,
        body: row.get(4)?,
        category: row.get(5)?,
        created_at: row.get(6)?,
        read: row.get(7)?,
    })
}

pub fn insert_direct_message(conn: &Connection, row: &DirectMessageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO direct_messages
            (id, sender_id, sender_role, target_role, body, category, created_at, read)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            row.id,
            row.sender_id,
            row.sender_role,
            row.target_role,
            row.body,
            row.category,
            row.created_at,
            row.read,
        ],
    )?;
    Ok(())
}

pub fn query_direct_message(conn: &Connection, id: &str) -> Result<Option<DirectMessageRow>> {
    let sql = format!("SELECT {} FROM direct_messages WHERE id = ?1", DIRECT_MESSAGE_COLUMNS);
    let row = conn.query_row(&sql, [id], direct_message_from_row).optional()?;
    Ok(row)
}

/// Messages sent to `role` and messages sent by `role`, newest first.
pub fn query_direct_messages_for_role(conn: &Connection, role: &str) -> Result<Vec<DirectMessageRow>> {
    let sql = format!(
        "SELECT {} FROM direct_messages
         WHERE target_role = ?1 OR sender_role = ?1
         ORDER BY created_at DESC, rowid DESC",
        DIRECT_MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([role], direct_message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Set the shared read flag. The statement only ever writes 1; returns the
/// number of rows that changed from unread to read.
pub fn set_direct_message_read(conn: &Connection, id: &str) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE direct_messages SET read = 1 WHERE id = ?1 AND read = 0",
        [id],
    )?;
    Ok(changed)
}

// -- Broadcasts --

fn broadcast_from_row(row: &Row<'_>) -> rusqlite::Result<BroadcastRow> {
    Ok(BroadcastRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        body: row.get(2)?,
        category: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn insert_broadcast(conn: &Connection, row: &BroadcastRow) -> Result<()> {
    conn.execute(
        "INSERT INTO broadcasts (id, author_id, body, category, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![row.id, row.author_id, row.body, row.category, row.created_at],
    )?;
    Ok(())
}

pub fn broadcast_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM broadcasts WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn query_broadcasts(conn: &Connection) -> Result<Vec<BroadcastRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, author_id, body, category, created_at
         FROM broadcasts
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map([], broadcast_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every broadcast, LEFT JOINed with this account's receipt.
pub fn query_broadcasts_for_account(conn: &Connection, account_id: &str) -> Result<Vec<BroadcastViewRow>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.author_id, b.body, b.category, b.created_at, r.read, r.read_at
         FROM broadcasts b
         LEFT JOIN broadcast_receipts r
            ON r.broadcast_id = b.id AND r.account_id = ?1
         ORDER BY b.created_at DESC, b.rowid DESC",
    )?;
    let rows = stmt
        .query_map([account_id], |row| {
            Ok(BroadcastViewRow {
                broadcast: broadcast_from_row(row)?,
                read: row.get(5)?,
                read_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Receipts --

/// Mark a broadcast read for one account. An existing read receipt is left
/// untouched, so the first `read_at` survives repeated calls.
pub fn upsert_receipt(conn: &Connection, broadcast_id: &str, account_id: &str, read_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO broadcast_receipts (broadcast_id, account_id, read, read_at)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(broadcast_id, account_id) DO UPDATE
            SET read = 1, read_at = COALESCE(broadcast_receipts.read_at, excluded.read_at)
            WHERE broadcast_receipts.read = 0",
        params![broadcast_id, account_id, read_at],
    )?;
    Ok(())
}

pub fn query_receipt(conn: &Connection, broadcast_id: &str, account_id: &str) -> Result<Option<ReceiptRow>> {
    let row = conn
        .query_row(
            "SELECT broadcast_id, account_id, read, read_at
             FROM broadcast_receipts
             WHERE broadcast_id = ?1 AND account_id = ?2",
            [broadcast_id, account_id],
            |row| {
                Ok(ReceiptRow {
                    broadcast_id: row.get(0)?,
                    account_id: row.get(1)?,
                    read: row.get(2)?,
                    read_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

// -- Counters --

/// Unread direct messages addressed to `role` plus broadcasts this account
/// holds no read receipt for.
pub fn count_unread(conn: &Connection, role: &str, account_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM direct_messages WHERE target_role = ?1 AND read = 0)
          + (SELECT COUNT(*) FROM broadcasts b
             WHERE NOT EXISTS (
                SELECT 1 FROM broadcast_receipts r
                WHERE r.broadcast_id = b.id AND r.account_id = ?2 AND r.read = 1
             ))",
        [role, account_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

pub fn count_broadcasts(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM broadcasts", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub fn count_receipts(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM broadcast_receipts", [], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}
