use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Publish error: {0}")]
    Publish(#[from] redis::RedisError),

    #[error("missing or invalid user identity")]
    Unauthenticated,

    #[error("not paired")]
    NotPaired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error text attached to error responses so later middleware can re-render it
/// for fragment callers without parsing the JSON body.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotPaired | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Publish(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::NotFound(msg) | AppError::InvalidInput(msg) => msg,
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database failure");
                self.to_string()
            }
            AppError::Publish(ref e) => {
                tracing::error!(error = %e, "Event publish failure");
                self.to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorMessage(message));
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotPaired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::NotFound("item 3".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidInput("item_key required".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_carries_error_message_extension() {
        let response = AppError::NotFound("not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let message = response.extensions().get::<ErrorMessage>().unwrap();
        assert_eq!(message.0, "not found");
    }
}
