//! Board Error Types
//!
//! Storage-level sentinels ([`StorageError`]) and the crate-level
//! [`BoardError`], which integrates with the unified `kernel::error::AppError`
//! system for HTTP responses.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::application::oidc::OidcError;

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Board result type alias
pub type BoardResult<T> = Result<T, BoardError>;

/// Errors returned by repositories
#[derive(Debug, Error)]
pub enum StorageError {
    /// Lookup, update or delete of an absent key
    #[error("not found")]
    NotFound,

    /// Create with a key that is already taken
    #[error("already exists")]
    AlreadyExists,

    /// Anything else the database reported
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound => ErrorKind::NotFound,
            StorageError::AlreadyExists => ErrorKind::Conflict,
            StorageError::Database(sqlx::Error::PoolTimedOut) => ErrorKind::ServiceUnavailable,
            StorageError::Database(_) => ErrorKind::InternalServerError,
        }
    }
}

/// Board-specific error variants
#[derive(Debug, Error)]
pub enum BoardError {
    /// Repository error surfaced unchanged
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Session lookup failed (absent session or database error)
    #[error("user session: {0}")]
    Session(#[source] StorageError),

    /// Session exists but has expired
    #[error("user session is expired")]
    SessionExpired,

    /// Session requested for a user without an ID
    #[error("user session: specified user has no id")]
    MissingUserId,

    /// Quiz attempt could not be persisted
    #[error("Unable to update user")]
    QuizAttempt(#[source] StorageError),

    /// Validation or authorization failure
    #[error(transparent)]
    Service(#[from] AppError),

    /// Federated login failure
    #[error(transparent)]
    Oidc(#[from] OidcError),
}

impl BoardError {
    /// Whether this error means the requested record does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            BoardError::Storage(e) | BoardError::Session(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::Storage(e) => e.kind(),
            BoardError::Session(StorageError::Database(_)) => ErrorKind::InternalServerError,
            BoardError::Session(_) | BoardError::SessionExpired => ErrorKind::Unauthorized,
            BoardError::MissingUserId | BoardError::QuizAttempt(_) => {
                ErrorKind::InternalServerError
            }
            BoardError::Service(e) => e.kind(),
            BoardError::Oidc(e) => e.kind(),
        }
    }

    /// Convert to AppError
    pub fn into_app_error(self) -> AppError {
        match self {
            BoardError::Service(e) => e,
            BoardError::Storage(StorageError::Database(_))
            | BoardError::Session(StorageError::Database(_)) => {
                AppError::new(self.kind(), "Database error")
            }
            other => AppError::new(other.kind(), other.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            BoardError::Storage(StorageError::Database(e))
            | BoardError::Session(StorageError::Database(e)) => {
                tracing::error!(error = %e, "Board database error");
            }
            BoardError::QuizAttempt(e) => {
                tracing::error!(error = %e, "Failed to record quiz attempt");
            }
            BoardError::MissingUserId => {
                tracing::error!("Session requested for user without id");
            }
            BoardError::Oidc(e) if e.kind().is_server_error() => {
                tracing::error!(error = %e, "Identity provider failure");
            }
            BoardError::Oidc(e) => {
                tracing::warn!(error = %e, "Rejected login callback");
            }
            _ => {
                tracing::debug!(error = %self, "Board error");
            }
        }
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        self.log();
        self.into_app_error().into_response()
    }
}
