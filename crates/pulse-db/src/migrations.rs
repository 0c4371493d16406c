use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (delivery schema)");
        conn.execute_batch(
            "
            CREATE TABLE accounts (
                id          TEXT PRIMARY KEY,
                role        TEXT NOT NULL CHECK (role IN ('admin', 'standard')),
                created_at  TEXT NOT NULL
            );

            -- sender_id is a weak reference: history outlives the account
            CREATE TABLE direct_messages (
                id           TEXT PRIMARY KEY,
                sender_id    TEXT NOT NULL,
                sender_role  TEXT NOT NULL CHECK (sender_role IN ('admin', 'standard')),
                target_role  TEXT NOT NULL CHECK (target_role IN ('admin', 'standard')),
                body         TEXT NOT NULL,
                category     TEXT NOT NULL
                    CHECK (category IN ('info', 'warning', 'success', 'urgent')),
                created_at   TEXT NOT NULL,
                read         INTEGER NOT NULL DEFAULT 0 CHECK (read IN (0, 1)),
                CHECK (sender_role <> target_role)
            );

            CREATE INDEX idx_direct_messages_target
                ON direct_messages(target_role, read);
            CREATE INDEX idx_direct_messages_created
                ON direct_messages(created_at);

            CREATE TABLE broadcasts (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL,
                body        TEXT NOT NULL,
                category    TEXT NOT NULL
                    CHECK (category IN ('info', 'warning', 'success', 'urgent')),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_broadcasts_created
                ON broadcasts(created_at);

            CREATE TABLE broadcast_receipts (
                broadcast_id  TEXT NOT NULL REFERENCES broadcasts(id),
                account_id    TEXT NOT NULL,
                read          INTEGER NOT NULL DEFAULT 1 CHECK (read IN (0, 1)),
                read_at       TEXT,
                PRIMARY KEY (broadcast_id, account_id)
            );

            CREATE INDEX idx_broadcast_receipts_account
                ON broadcast_receipts(account_id, read);

            CREATE TRIGGER direct_messages_read_monotonic
                BEFORE UPDATE OF read ON direct_messages
                WHEN OLD.read = 1 AND NEW.read = 0
            BEGIN
                SELECT RAISE(ABORT, 'direct message read flag cannot be cleared');
            END;

            CREATE TRIGGER broadcast_receipts_read_monotonic
                BEFORE UPDATE OF read ON broadcast_receipts
                WHEN OLD.read = 1 AND NEW.read = 0
            BEGIN
                SELECT RAISE(ABORT, 'broadcast receipt read flag cannot be cleared');
            END;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
