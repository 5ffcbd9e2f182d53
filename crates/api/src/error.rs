//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Access denials from the gate never pass through here; they are answered by
//! the cart access middleware together with their cache tags.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::access::{AccessError, FieldAccessError};
use crate::context::ContextError;
use crate::db::RepositoryError;
use crate::identity::IdentityError;

/// Application-level error type for the cart API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart storage operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session or token identity could not be read or written.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// The access gate could not reach a decision.
    #[error("Access check failed: {0}")]
    Access(#[from] AccessError),

    /// An entity type without field rules reached the cart API.
    #[error("Field access misconfigured: {0}")]
    FieldAccess(#[from] FieldAccessError),

    /// The middleware stack is missing a layer.
    #[error("Request context error: {0}")]
    Context(#[from] ContextError),

    /// A write touched a field the cart API does not allow.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_)
            | Self::Identity(_)
            | Self::Access(_)
            | Self::FieldAccess(_)
            | Self::Context(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            _ if status.is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
