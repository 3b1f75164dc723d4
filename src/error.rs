use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Message returned for storage failures; the detail only goes to the log.
const INTERNAL_MESSAGE: &str = "Internal Server Error";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Bad or missing input, including references to rows that do not exist.
    #[display(fmt = "{}: {}", field, message)]
    Validation { field: String, message: String },

    #[display(fmt = "{} not found", _0)]
    NotFound(String),

    #[display(fmt = "forbidden: {}", _0)]
    Forbidden(String),

    #[display(fmt = "unauthorized: {}", _0)]
    Unauthorized(String),

    /// Store unavailable or a constraint the validation did not catch.
    #[display(fmt = "storage error: {}", _0)]
    Storage(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl std::error::Error for AppError {}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn referential(field: impl Into<String>) -> Self {
        Self::validation(field, "referential integrity violation")
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation { .. })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation { field, message } => json!({
                "message": message,
                "field": field,
            }),
            AppError::NotFound(what) => json!({ "message": format!("{} not found", what) }),
            AppError::Forbidden(reason) | AppError::Unauthorized(reason) => {
                json!({ "message": reason })
            }
            AppError::Storage(detail) => {
                tracing::error!(error = %detail, "Storage failure");
                json!({ "message": INTERNAL_MESSAGE })
            }
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
