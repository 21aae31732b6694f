//! Error types for configuration and request handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither the credential nor its file variable is set
    #[error("credential {key} is not set (set {key} or {file_var})")]
    MissingSecret { key: String, file_var: String },

    /// The secret file could not be read
    #[error("cannot read secret file {path:?} for {key}: {source}")]
    SecretFile {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required setting is missing
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Request-level errors.
///
/// Only a status code and a short plain-text message ever reach the client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Fetching or reading the object failed
    #[error("object not available: {key}")]
    NotFound { key: String },

    /// Storing the object failed
    #[error("Can't put {key}. Failed.")]
    PutFailed { key: String },
}

impl ApiError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PutFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::NotFound { .. } => status.into_response(),
            Self::PutFailed { .. } => (status, self.to_string()).into_response(),
        }
    }
}
