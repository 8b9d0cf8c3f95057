use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;
use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found() -> Self {
        AppError::NotFound("Not found.".to_string())
    }

    pub fn permission_denied() -> Self {
        AppError::Forbidden("You do not have permission to perform this action.".to_string())
    }

    pub fn not_authenticated() -> Self {
        AppError::AuthError("Authentication credentials were not provided.".to_string())
    }

    /// Shorthand for a validation error carrying a single field message.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        AppError::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(errors) => {
                warn!(code = self.code(), fields = ?errors, "Request rejected");
            }
            AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Invalid input.".to_string(),
            AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Only field messages are exposed as details; internal causes stay in the log.
        let details = match &self {
            AppError::Validation(errors) => Some(errors.to_json()),
            _ => None,
        };

        let mut response = error_response(code, self.public_message(), details, status);
        if matches!(self, AppError::AuthError(_)) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::field(FieldErrors::NON_FIELD, rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::field(FieldErrors::NON_FIELD, rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::not_found()
    }
}

/// True when the error is a PostgreSQL unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}
