use crate::models::{ShortMessageRow, UserRow};
use crate::Database;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, ErrorCode, Row};

const MESSAGE_COLUMNS: &str = "id, body, views_counter, created, updated";

impl Database {
    // -- Users --

    /// Inserts a user. Returns `false` when the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    // -- Tokens --

    /// Returns the user's token, storing `candidate` first if the user has
    /// none yet. A user never holds more than one token.
    pub fn get_or_create_token(&self, user_id: &str, candidate: &str) -> Result<String> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO tokens (key, user_id) VALUES (?1, ?2)",
                (candidate, user_id),
            )?;
            let key: String = tx
                .query_row("SELECT key FROM tokens WHERE user_id = ?1", [user_id], |row| {
                    row.get(0)
                })
                .map_err(|_| anyhow!("No token stored for user {}", user_id))?;
            tx.commit()?;
            Ok(key)
        })
    }

    /// Resolves a presented token to the user it was issued to.
    pub fn get_user_by_token(&self, key: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.password, u.created_at
                 FROM tokens t
                 JOIN users u ON u.id = t.user_id
                 WHERE t.key = ?1",
            )?;

            stmt.query_row([key], map_user).optional()
        })
    }

    // -- Short messages --

    pub fn list_messages(&self) -> Result<Vec<ShortMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM short_messages ORDER BY id"))?;

            let rows = stmt
                .query_map([], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Plain lookup, leaves the counter alone.
    pub fn get_message(&self, id: i64) -> Result<Option<ShortMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM short_messages WHERE id = ?1"),
                [id],
                map_message,
            )
            .optional()
        })
    }

    pub fn insert_message(&self, body: &str) -> Result<ShortMessageRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!("INSERT INTO short_messages (body) VALUES (?1) RETURNING {MESSAGE_COLUMNS}"),
                [body],
                map_message,
            )?;
            Ok(row)
        })
    }

    /// Bumps the counter and returns the row as stored afterwards, in one
    /// statement. `None` if the message does not exist.
    pub fn increment_views(&self, id: i64) -> Result<Option<ShortMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE short_messages SET views_counter = views_counter + 1
                     WHERE id = ?1
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                [id],
                map_message,
            )
            .optional()
        })
    }

    /// Replaces the body and zeroes the counter in one statement.
    pub fn update_message(&self, id: i64, body: &str) -> Result<Option<ShortMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE short_messages
                     SET body = ?2, views_counter = 0, updated = datetime('now')
                     WHERE id = ?1
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                rusqlite::params![id, body],
                map_message,
            )
            .optional()
        })
    }

    pub fn reset_views(&self, id: i64) -> Result<Option<ShortMessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "UPDATE short_messages
                     SET views_counter = 0, updated = datetime('now')
                     WHERE id = ?1
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                [id],
                map_message,
            )
            .optional()
        })
    }

    /// Returns `false` if there was nothing to delete.
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM short_messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    stmt.query_row([username], map_user).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<ShortMessageRow> {
    Ok(ShortMessageRow {
        id: row.get(0)?,
        body: row.get(1)?,
        views_counter: row.get(2)?,
        created: row.get(3)?,
        updated: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn new_message_starts_with_zero_views() {
        let db = db();
        let row = db.insert_message("test-body").unwrap();

        assert_eq!(row.body, "test-body");
        assert_eq!(row.views_counter, 0);
    }

    #[test]
    fn increment_views_changes_counter_by_one() {
        let db = db();
        let id = db.insert_message("test").unwrap().id;

        assert_eq!(db.increment_views(id).unwrap().unwrap().views_counter, 1);
        assert_eq!(db.increment_views(id).unwrap().unwrap().views_counter, 2);
        assert_eq!(db.get_message(id).unwrap().unwrap().views_counter, 2);
    }

    #[test]
    fn reset_views_sets_counter_to_zero() {
        let db = db();
        let id = db.insert_message("test").unwrap().id;
        for _ in 0..5 {
            db.increment_views(id).unwrap();
        }

        let row = db.reset_views(id).unwrap().unwrap();
        assert_eq!(row.views_counter, 0);
        assert_eq!(row.body, "test");
    }

    #[test]
    fn update_replaces_body_and_resets_counter() {
        let db = db();
        let id = db.insert_message("test").unwrap().id;
        db.increment_views(id).unwrap();

        let row = db.update_message(id, "updated-body").unwrap().unwrap();
        assert_eq!(row.body, "updated-body");
        assert_eq!(row.views_counter, 0);
    }

    #[test]
    fn missing_message_yields_none() {
        let db = db();
        assert!(db.get_message(42).unwrap().is_none());
        assert!(db.increment_views(42).unwrap().is_none());
        assert!(db.update_message(42, "x").unwrap().is_none());
        assert!(db.reset_views(42).unwrap().is_none());
        assert!(!db.delete_message(42).unwrap());
    }

    #[test]
    fn list_keeps_insertion_order_and_skips_deleted() {
        let db = db();
        let first = db.insert_message("first").unwrap().id;
        let second = db.insert_message("second").unwrap().id;
        let third = db.insert_message("third").unwrap().id;

        assert!(db.delete_message(second).unwrap());

        let ids: Vec<i64> = db.list_messages().unwrap().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first, third]);
    }

    #[test]
    fn duplicate_username_is_refused() {
        let db = db();
        assert!(db.create_user("a", "alice", "hash").unwrap());
        assert!(!db.create_user("b", "alice", "hash").unwrap());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn token_is_bound_to_one_user() {
        let db = db();
        db.create_user("u1", "alice", "hash").unwrap();

        let first = db.get_or_create_token("u1", "key-one").unwrap();
        let second = db.get_or_create_token("u1", "key-two").unwrap();
        assert_eq!(first, "key-one");
        assert_eq!(second, "key-one");

        let user = db.get_user_by_token("key-one").unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(db.get_user_by_token("key-two").unwrap().is_none());
    }
}
