use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::messages;

/// Every route the service exposes. Reads are open; handlers that take an
/// `AuthUser` argument require a token.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api_root))
        .route("/register/", post(auth::register))
        .route("/acquire_token/", post(auth::acquire_token))
        .route(
            "/short_messages/",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/short_messages/{id}/",
            get(messages::get_message)
                .put(messages::update_message)
                .patch(messages::partial_update_message)
                .delete(messages::delete_message),
        )
        .with_state(state)
}

async fn api_root() -> Json<Value> {
    Json(json!({ "short_messages": "/short_messages/" }))
}
