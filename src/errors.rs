//! API client error types

use thiserror::Error;

use crate::models::Realm;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not logged in to the {} realm. Run 'eduadmin login' first", .realm.as_str())]
    NotAuthenticated { realm: Realm },

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response has no '{key}' collection and no top-level array")]
    MissingCollection { key: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse API response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
