use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clickcore::ClickerError;

/// Errors returned by HTTP handlers.
///
/// Authentication failures never tell the client why; internal errors are
/// logged with full context and answered with a generic body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ClickerError> for AppError {
    fn from(err: ClickerError) -> Self {
        match &err {
            ClickerError::Auth(e) => {
                log::warn!("Rejected init data: {}", e);
                AppError::Unauthorized
            }
            ClickerError::NotFound(user_id) => AppError::NotFound(format!("user {} not found", user_id)),
            ClickerError::InsufficientClicks { .. } => AppError::BadRequest(err.to_string()),
            ClickerError::Storage(_) | ClickerError::Config(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickcore::{AuthError, StorageError};

    #[test]
    fn test_auth_errors_map_to_unauthorized() {
        let err: AppError = ClickerError::Auth(AuthError::InvalidSignature).into();
        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_storage_errors_are_internal() {
        let io = std::io::Error::other("disk full");
        let err: AppError = ClickerError::Storage(StorageError::Io(io)).into();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_short_balance_is_bad_request() {
        let err: AppError = ClickerError::InsufficientClicks { need: 200, have: 3 }.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
