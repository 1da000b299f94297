//! Shared types for the Quill service: domain models and the JSON shapes
//! exchanged over HTTP.

pub mod api;
pub mod models;
