use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use tracing::warn;

use quill_types::models::User;

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// Authorization scheme keyword, matched case-insensitively.
const KEYWORD: &str = "Token";

const NOT_PROVIDED: &str = "Authentication credentials were not provided.";
const NO_CREDENTIALS: &str = "Invalid token header. No credentials provided.";
const HAS_SPACES: &str = "Invalid token header. Token string should not contain spaces.";
const BAD_CHARACTERS: &str =
    "Invalid token header. Token string should not contain invalid characters.";
const INVALID_TOKEN: &str = "Invalid token.";

/// The user behind a valid `Authorization: Token <key>` header.
///
/// Taking this as a handler argument is what puts a route in the write tier:
/// the request is rejected with 401 before the body is even read.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = token_from_headers(&parts.headers)?;

        let lookup = key.clone();
        match blocking(state, move |db| db.get_user_by_token(&lookup)).await? {
            Some(row) => Ok(AuthUser(row.into_model())),
            None => {
                warn!("Rejected unknown token {}…", key.chars().take(6).collect::<String>());
                Err(ApiError::Unauthorized(INVALID_TOKEN))
            }
        }
    }
}

/// Pulls the key out of the Authorization header. A header using some other
/// scheme counts as no credentials at all.
fn token_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(ApiError::Unauthorized(NOT_PROVIDED));
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized(BAD_CHARACTERS))?;

    let mut words = raw.split_whitespace();
    match words.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(KEYWORD) => {}
        _ => return Err(ApiError::Unauthorized(NOT_PROVIDED)),
    }

    let key = words.next().ok_or(ApiError::Unauthorized(NO_CREDENTIALS))?;
    if words.next().is_some() {
        return Err(ApiError::Unauthorized(HAS_SPACES));
    }

    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    fn reason(result: Result<String, ApiError>) -> &'static str {
        match result {
            Err(ApiError::Unauthorized(reason)) => reason,
            other => panic!("expected unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn extracts_key_from_token_scheme() {
        assert_eq!(token_from_headers(&headers("Token abc123")).unwrap(), "abc123");
        assert_eq!(token_from_headers(&headers("token abc123")).unwrap(), "abc123");
    }

    #[test]
    fn missing_or_foreign_scheme_means_not_provided() {
        assert_eq!(reason(token_from_headers(&HeaderMap::new())), NOT_PROVIDED);
        assert_eq!(reason(token_from_headers(&headers("Bearer abc123"))), NOT_PROVIDED);
        assert_eq!(reason(token_from_headers(&headers(""))), NOT_PROVIDED);
    }

    #[test]
    fn malformed_token_headers() {
        assert_eq!(reason(token_from_headers(&headers("Token"))), NO_CREDENTIALS);
        assert_eq!(reason(token_from_headers(&headers("Token abc def"))), HAS_SPACES);
    }
}
