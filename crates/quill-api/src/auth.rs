use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rand_core::{OsRng, RngCore};
use tracing::{error, info, warn};
use uuid::Uuid;

use quill_db::Database;
use quill_types::api::{FieldErrors, RegisterRequest, RegisterResponse, TokenRequest, TokenResponse};
use quill_types::models::{FIELD_BLANK, FIELD_REQUIRED};

use crate::error::{ApiError, ApiJson};
use crate::password::{self, PasswordPolicy};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub password_policy: PasswordPolicy,
}

const USERNAME_MAX_CHARS: usize = 150;
const TOKEN_BYTES: usize = 20;

pub(crate) const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Runs a store call on the blocking pool.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(ApiError::Internal)
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();

    let username = match clean_username(req.username.as_deref()) {
        Ok(username) => Some(username),
        Err(msg) => {
            errors.entry("username".into()).or_default().push(msg);
            None
        }
    };

    match req.password.as_deref() {
        None => errors.entry("password".into()).or_default().push(FIELD_REQUIRED.into()),
        Some("") => errors.entry("password".into()).or_default().push(FIELD_BLANK.into()),
        Some(password) => {
            if let Err(problems) = state
                .password_policy
                .check(password, username.as_deref().unwrap_or_default())
            {
                errors.entry("password".into()).or_default().extend(problems);
            }
        }
    }

    // Check if username is taken
    if let Some(name) = username.clone() {
        if blocking(&state, move |db| db.get_user_by_username(&name)).await?.is_some() {
            errors.entry("username".into()).or_default().push(username_taken());
        }
    }

    let (Some(username), Some(password), true) = (username, req.password, errors.is_empty()) else {
        return Err(ApiError::Validation(errors));
    };

    // Hash off the async runtime, Argon2 is deliberately slow
    let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let user_id = Uuid::new_v4().to_string();
    let name = username.clone();
    let created = blocking(&state, move |db| db.create_user(&user_id, &name, &password_hash)).await?;
    if !created {
        // Lost a race with a concurrent registration of the same name.
        return Err(ApiError::field("username", username_taken()));
    }

    info!("Registered user {}", username);
    Ok((StatusCode::CREATED, Json(RegisterResponse { username })))
}

pub async fn acquire_token(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let username = required(&mut errors, "username", req.username.map(|u| u.trim().to_string()));
    let password = required(&mut errors, "password", req.password);

    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::Validation(errors));
    };

    let lookup = username.clone();
    let Some(user) = blocking(&state, move |db| db.get_user_by_username(&lookup)).await? else {
        warn!("Token requested for unknown user {}", username);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    };

    let stored = user.password.clone();
    let valid = tokio::task::spawn_blocking(move || password::verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;
    if !valid {
        warn!("Wrong password for user {}", username);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let candidate = generate_token_key();
    let user_id = user.id.clone();
    let token = blocking(&state, move |db| db.get_or_create_token(&user_id, &candidate)).await?;

    info!("Issued token for user {}", username);
    Ok(Json(TokenResponse { token }))
}

fn clean_username(raw: Option<&str>) -> Result<String, String> {
    let username = raw.ok_or_else(|| FIELD_REQUIRED.to_string())?.trim();

    if username.is_empty() {
        return Err(FIELD_BLANK.to_string());
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(format!(
            "Ensure this field has no more than {USERNAME_MAX_CHARS} characters."
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err("Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.".to_string());
    }

    Ok(username.to_string())
}

fn required(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match value {
        None => {
            errors.insert(field.to_string(), vec![FIELD_REQUIRED.to_string()]);
            None
        }
        Some(v) if v.is_empty() => {
            errors.insert(field.to_string(), vec![FIELD_BLANK.to_string()]);
            None
        }
        Some(v) => Some(v),
    }
}

fn username_taken() -> String {
    "A user with that username already exists.".to_string()
}

/// 40 hex characters of OS randomness.
fn generate_token_key() -> String {
    let mut key = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut key);
    hex::encode(key)
}
