pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod password;
pub mod routes;

pub use auth::{AppState, AppStateInner};
pub use routes::router;
