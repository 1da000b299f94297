use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{FIELD_NULL, ShortMessage};

/// Validation failures keyed by request field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

// -- Auth --

// Unknown fields are accepted and ignored on every request body.

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Short messages --

/// Create/update payload. `id` and `views_counter` are read-only, so a
/// client sending them has no effect.
///
/// `body` is `None` when the field is left out and `Some(None)` when it is
/// sent as `null`.
#[derive(Debug, Default, Deserialize)]
pub struct ShortMessageRequest {
    #[serde(default, deserialize_with = "present")]
    pub body: Option<Option<String>>,
}

impl ShortMessageRequest {
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Cleaned body, or the message to report for the `body` field.
    pub fn clean_body(&self) -> Result<String, String> {
        match &self.body {
            Some(None) => Err(FIELD_NULL.to_string()),
            Some(Some(raw)) => ShortMessage::clean_body(Some(raw.as_str())),
            None => ShortMessage::clean_body(None),
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortMessageResponse {
    pub id: i64,
    pub body: String,
    pub views_counter: u64,
}

impl From<ShortMessage> for ShortMessageResponse {
    fn from(message: ShortMessage) -> Self {
        Self {
            id: message.id,
            body: message.body,
            views_counter: message.views_counter,
        }
    }
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}
