//! Database row types — these map directly to SQLite rows.
//! Distinct from quill-types models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use quill_types::models::{ShortMessage, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct ShortMessageRow {
    pub id: i64,
    pub body: String,
    pub views_counter: i64,
    pub created: String,
    pub updated: String,
}

impl UserRow {
    pub fn into_model(self) -> User {
        User {
            id: self.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt user id '{}': {}", self.id, e);
                Uuid::default()
            }),
            created_at: parse_timestamp(&self.created_at, &self.id),
            username: self.username,
        }
    }
}

impl ShortMessageRow {
    pub fn into_model(self) -> ShortMessage {
        let key = self.id.to_string();
        ShortMessage {
            id: self.id,
            views_counter: u64::try_from(self.views_counter).unwrap_or_else(|_| {
                warn!("Negative views_counter {} on message {}", self.views_counter, self.id);
                0
            }),
            created: parse_timestamp(&self.created, &key),
            updated: parse_timestamp(&self.updated, &key),
            body: self.body,
        }
    }
}

fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", raw, owner, e);
            DateTime::default()
        })
}
