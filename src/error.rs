use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// AppError
///
/// The single failure taxonomy of the service. Every layer (auth gate, policy,
/// lifecycle, repository) returns this type, and the request boundary turns it
/// into an HTTP status plus a `{error, message}` JSON body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Unknown DNI and wrong password share this variant so the two cases are indistinguishable.
    #[error("invalid DNI or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    /// The actor's role does not grant the operation.
    #[error("you do not have permission to perform this action")]
    Forbidden,

    /// The role is sufficient but the target lies outside the actor's area.
    #[error("the target belongs to another area")]
    ForbiddenArea,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    DuplicateKey(String),

    #[error("{0} is already inactive")]
    AlreadyInactive(&'static str),

    #[error("{0} is already active")]
    AlreadyActive(&'static str),

    #[error("{0}")]
    ValidationFailed(String),

    /// Storage or transport failure. The detail is logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorBody
///
/// The JSON shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `FORBIDDEN_AREA`.
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::ForbiddenArea => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey(_)
            | AppError::AlreadyInactive(_)
            | AppError::AlreadyActive(_)
            | AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Forbidden => "FORBIDDEN",
            AppError::ForbiddenArea => "FORBIDDEN_AREA",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateKey(_) => "DUPLICATE_KEY",
            AppError::AlreadyInactive(_) => "ALREADY_INACTIVE",
            AppError::AlreadyActive(_) => "ALREADY_ACTIVE",
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    /// Client-facing message: specific for 4xx, generic for 5xx.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationFailed(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Internal(detail) = &self {
            tracing::error!(detail = %detail, "request failed with an internal error");
        }

        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Maps storage failures onto the taxonomy.
///
/// Unique violations come from the partial unique indexes that make
/// uniqueness-among-active authoritative, so they surface as `DuplicateKey`
/// even when two concurrent creates both passed the application pre-check.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return AppError::DuplicateKey(duplicate_message(db.constraint()).to_string());
            }
            if db.is_foreign_key_violation() {
                return AppError::NotFound("referenced entity");
            }
        }
        AppError::Internal(err.to_string())
    }
}

pub const DUPLICATE_DNI: &str = "an active user with this DNI already exists";
pub const DUPLICATE_RECORD_NUMBER: &str = "an active expediente with this number already exists";

fn duplicate_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_dni_active_key") => DUPLICATE_DNI,
        Some("expedientes_record_number_active_key") => DUPLICATE_RECORD_NUMBER,
        _ => "duplicate key",
    }
}

pub type AppResult<T> = Result<T, AppError>;
