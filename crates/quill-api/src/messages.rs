use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::{debug, info};

use quill_types::api::{ShortMessageRequest, ShortMessageResponse};
use quill_types::models::ShortMessage;

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiJson};
use crate::middleware::AuthUser;

/// Ids that are not integers can never match a message.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

async fn ensure_exists(state: &AppState, id: i64) -> Result<(), ApiError> {
    blocking(state, move |db| db.get_message(id))
        .await?
        .map(|_| ())
        .ok_or(ApiError::NotFound)
}

/// Rejects an invalid body, but an unknown id wins over a bad body.
async fn clean_body_for(state: &AppState, id: i64, req: &ShortMessageRequest) -> Result<String, ApiError> {
    match req.clean_body() {
        Ok(body) => Ok(body),
        Err(msg) => {
            ensure_exists(state, id).await?;
            Err(ApiError::field("body", msg))
        }
    }
}

/// PATCH payload. An empty body stands for `{}`, anything else must be JSON.
fn partial_payload(headers: &HeaderMap, bytes: &Bytes) -> Result<ShortMessageRequest, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ShortMessageRequest::default());
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if !is_json {
        return Err(ApiError::BadRequest(
            "Expected request with `Content-Type: application/json`".to_string(),
        ));
    }

    serde_json::from_slice(bytes).map_err(|e| {
        ApiError::BadRequest(format!("Failed to deserialize the JSON body into the target type: {e}"))
    })
}

fn respond(message: ShortMessage) -> Json<ShortMessageResponse> {
    Json(message.into())
}

pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShortMessageResponse>>, ApiError> {
    let rows = blocking(&state, |db| db.list_messages()).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| ShortMessageResponse::from(row.into_model()))
            .collect(),
    ))
}

/// Counts as a view: the counter goes up before the message is returned.
pub async fn get_message(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id)?;
    let message = blocking(&state, move |db| db.increment_views(id))
        .await?
        .ok_or(ApiError::NotFound)?
        .into_model();

    debug!("Read {}", message);
    Ok(respond(message))
}

pub async fn create_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ShortMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req.clean_body().map_err(|msg| ApiError::field("body", msg))?;

    let message = blocking(&state, move |db| db.insert_message(&body))
        .await?
        .into_model();

    info!("Short message {} created by {}", message.id, user.username);
    Ok((StatusCode::CREATED, respond(message)))
}

/// Full update: body is required and the counter always drops to zero.
pub async fn update_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
    ApiJson(req): ApiJson<ShortMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id)?;
    let body = clean_body_for(&state, id, &req).await?;

    let message = blocking(&state, move |db| db.update_message(id, &body))
        .await?
        .ok_or(ApiError::NotFound)?
        .into_model();

    info!("Short message {} updated by {}", id, user.username);
    Ok(respond(message))
}

/// Like `update_message`, but the body (field or whole payload) may be left
/// out. The counter is reset either way.
pub async fn partial_update_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id)?;
    let req = partial_payload(&headers, &payload)?;

    let row = if req.has_body() {
        let body = clean_body_for(&state, id, &req).await?;
        blocking(&state, move |db| db.update_message(id, &body)).await?
    } else {
        blocking(&state, move |db| db.reset_views(id)).await?
    };
    let message = row.ok_or(ApiError::NotFound)?.into_model();

    info!("Short message {} patched by {}", id, user.username);
    Ok(respond(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;

    if !blocking(&state, move |db| db.delete_message(id)).await? {
        return Err(ApiError::NotFound);
    }

    info!("Short message {} deleted by {}", id, user.username);
    Ok(StatusCode::NO_CONTENT)
}
