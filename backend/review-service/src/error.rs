/// Error types for Review Service
///
/// Every service operation returns [`AppError`]. Errors are converted to HTTP
/// responses at the handler boundary; store-level details never reach clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;

/// Result type for review-service operations
pub type Result<T> = std::result::Result<T, AppError>;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Entity, content or user absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate of a unique pair (episode review, report, favorite...)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Caller is not the author of the entity
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rejected before reaching the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyExists(_) => "ALREADY_EXISTS",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {} not found", entity, id))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Database error");
                "Database error occurred".to_string()
            }
            AppError::Unexpected(msg) => {
                tracing::error!(error = %msg, "Unexpected error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            },
            "status": status.as_u16(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                AppError::AlreadyExists(
                    db_err
                        .constraint()
                        .map(|c| format!("duplicate entry violates {}", c))
                        .unwrap_or_else(|| "duplicate entry".to_string()),
                )
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(errors.to_string())
    }
}
