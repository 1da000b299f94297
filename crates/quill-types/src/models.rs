use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted message body, counted in characters (not bytes).
pub const BODY_MAX_CHARS: usize = 160;

pub const FIELD_REQUIRED: &str = "This field is required.";
pub const FIELD_BLANK: &str = "This field may not be blank.";
pub const FIELD_NULL: &str = "This field may not be null.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A stored short message. `views_counter` is only ever written by the
/// server: it grows on single reads and drops back to zero on updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortMessage {
    pub id: i64,
    pub body: String,
    pub views_counter: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ShortMessage {
    /// Trims a client-supplied body and checks it fits the 1..=160 character
    /// window. Returns the cleaned body or the message to report for the
    /// `body` field.
    pub fn clean_body(raw: Option<&str>) -> Result<String, String> {
        let body = raw.ok_or_else(|| FIELD_REQUIRED.to_string())?.trim();

        if body.is_empty() {
            return Err(FIELD_BLANK.to_string());
        }
        if body.chars().count() > BODY_MAX_CHARS {
            return Err(format!(
                "Ensure this field has no more than {BODY_MAX_CHARS} characters."
            ));
        }

        Ok(body.to_string())
    }
}

impl fmt::Display for ShortMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" - {} views.", self.body, self.views_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str, views_counter: u64) -> ShortMessage {
        let now = Utc::now();
        ShortMessage {
            id: 1,
            body: body.to_string(),
            views_counter,
            created: now,
            updated: now,
        }
    }

    #[test]
    fn display_shows_body_and_views() {
        assert_eq!(
            message("test-body", 100).to_string(),
            "\"test-body\" - 100 views."
        );
    }

    #[test]
    fn clean_body_accepts_boundaries() {
        assert_eq!(ShortMessage::clean_body(Some("a")).unwrap(), "a");

        let longest = "t".repeat(BODY_MAX_CHARS);
        assert_eq!(ShortMessage::clean_body(Some(longest.as_str())).unwrap(), longest);
    }

    #[test]
    fn clean_body_rejects_too_long() {
        let err = ShortMessage::clean_body(Some("t".repeat(BODY_MAX_CHARS + 1).as_str())).unwrap_err();
        assert_eq!(err, "Ensure this field has no more than 160 characters.");
    }

    #[test]
    fn clean_body_counts_characters_not_bytes() {
        let body = "ż".repeat(BODY_MAX_CHARS);
        assert!(body.len() > BODY_MAX_CHARS);
        assert!(ShortMessage::clean_body(Some(body.as_str())).is_ok());
    }

    #[test]
    fn clean_body_rejects_missing_and_blank() {
        assert_eq!(ShortMessage::clean_body(None).unwrap_err(), FIELD_REQUIRED);
        assert_eq!(ShortMessage::clean_body(Some("")).unwrap_err(), FIELD_BLANK);
        assert_eq!(ShortMessage::clean_body(Some("   \n")).unwrap_err(), FIELD_BLANK);
    }

    #[test]
    fn clean_body_trims_whitespace() {
        assert_eq!(ShortMessage::clean_body(Some("  hi  ")).unwrap(), "hi");
    }
}
