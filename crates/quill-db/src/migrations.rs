use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tokens (
            key         TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS short_messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            body            TEXT NOT NULL CHECK (length(body) BETWEEN 1 AND 160),
            views_counter   INTEGER NOT NULL DEFAULT 0 CHECK (views_counter >= 0),
            created         TEXT NOT NULL DEFAULT (datetime('now')),
            updated         TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
