use thiserror::Error;

use crate::auth::AuthError;

/// Failures of the persistence layer.
///
/// Never shown to HTTP clients verbatim: the web layer logs the full error and
/// answers with a generic 500.
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// IO errors (JSON file backend)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors (JSON file backend)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Blocking task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Persisted data cannot be mapped back to score records
    #[error("Corrupt score data: {0}")]
    Corrupt(String),
}

/// Centralized error type for the click service.
///
/// Uses `thiserror` for conversion from the lower layers, so `?` works across
/// verifier, storage and game code.
///
/// # Example
///
/// ```no_run
/// use clickcore::ClickerError;
///
/// fn describe(err: &ClickerError) -> &'static str {
///     match err {
///         ClickerError::Auth(_) => "unauthorized",
///         ClickerError::Storage(_) => "internal",
///         _ => "bad request",
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum ClickerError {
    /// Init data did not verify
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Operation requires an existing record
    #[error("User {0} not found")]
    NotFound(i64),

    /// Purchase costs more than the current balance
    #[error("Not enough clicks: need {need}, have {have}")]
    InsufficientClicks { need: i64, have: i64 },

    /// Persistence failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Result with ClickerError
pub type ClickerResult<T> = Result<T, ClickerError>;

impl From<rusqlite::Error> for ClickerError {
    fn from(err: rusqlite::Error) -> Self {
        ClickerError::Storage(StorageError::Sqlite(err))
    }
}

impl From<r2d2::Error> for ClickerError {
    fn from(err: r2d2::Error) -> Self {
        ClickerError::Storage(StorageError::Pool(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_converts() {
        let err: ClickerError = AuthError::MissingHash.into();
        assert!(matches!(err, ClickerError::Auth(AuthError::MissingHash)));
        assert_eq!(err.to_string(), "Authentication failed: missing hash");
    }

    #[test]
    fn test_storage_error_display_keeps_context() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err: ClickerError = StorageError::from(io).into();
        assert!(err.to_string().contains("read-only fs"));
    }
}
