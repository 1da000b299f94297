#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use quill_api::password::PasswordPolicy;
use quill_api::{AppState, AppStateInner, router};
use quill_db::Database;

pub const TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";
pub const USER_ID: &str = "00000000-0000-0000-0000-000000000001";

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            password_policy: PasswordPolicy::default(),
        });
        let router = router(state.clone());
        Self { state, router }
    }

    /// Same as `new`, plus a user holding [`TOKEN`].
    pub fn with_user() -> Self {
        let app = Self::new();
        app.state.db.create_user(USER_ID, "test_username", "not-a-real-hash").unwrap();
        app.state.db.get_or_create_token(USER_ID, TOKEN).unwrap();
        app
    }

    pub fn seed_message(&self, body: &str, views: u64) -> i64 {
        let id = self.state.db.insert_message(body).unwrap().id;
        for _ in 0..views {
            self.state.db.increment_views(id).unwrap();
        }
        id
    }

    pub fn message_count(&self) -> usize {
        self.state.db.list_messages().unwrap().len()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(request("GET", uri, None, None)).await
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn detail_url(id: i64) -> String {
    format!("/short_messages/{id}/")
}
