//! Error taxonomy shared by the stores, the deletion queue and the service.

use thiserror::Error;

use crate::domain::entities::ShortLink;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Tagged failure returned by every store and service operation.
///
/// Callers are expected to `match` on the variant rather than on message text.
/// [`AppError::AlreadyExists`] is special: the conflicting record travels with
/// the error and must be surfaced to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("short link not found: {code}")]
    NotFound { code: String },

    #[error("short link has been deleted: {code}")]
    Gone { code: String },

    #[error("url is already shortened as {}", existing.code)]
    AlreadyExists { existing: ShortLink },

    #[error("short code is already taken: {code}")]
    CodeCollision { code: String },

    #[error("deletion queue is full")]
    QueueFull,

    #[error("{context}: {source}")]
    BackendUnavailable {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl AppError {
    pub fn not_found(code: impl Into<String>) -> Self {
        Self::NotFound { code: code.into() }
    }

    pub fn gone(code: impl Into<String>) -> Self {
        Self::Gone { code: code.into() }
    }

    pub fn already_exists(existing: ShortLink) -> Self {
        Self::AlreadyExists { existing }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn backend(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::BackendUnavailable {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Prefixes the context of a backend failure.
    ///
    /// Tagged outcomes (`NotFound`, `Gone`, `AlreadyExists`, ...) pass through
    /// untouched so callers can still match on them.
    pub fn context(self, context: impl Into<String>) -> Self {
        match self {
            Self::BackendUnavailable {
                context: inner,
                source,
            } => Self::BackendUnavailable {
                context: format!("{}: {}", context.into(), inner),
                source,
            },
            other => other,
        }
    }

    /// Returns the existing record carried by an `AlreadyExists` conflict.
    pub fn existing_link(&self) -> Option<&ShortLink> {
        match self {
            Self::AlreadyExists { existing } => Some(existing),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::backend("database error", e)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::backend("database migration failed", e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::backend("log file i/o error", e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::backend("log record encoding failed", e)
    }
}
