//! Error taxonomy shared by every component.
//!
//! Components return `Result<T, AppError>`; the HTTP layer turns the error into
//! a status code plus a short notice. Infrastructure failures are logged here
//! and reach the client only as a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Absent, or present but owned by someone else.
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("this time is no longer available, please choose another one")]
    SlotUnavailable,

    #[error("this time has an active booking; cancel the booking first")]
    SlotBooked,

    #[error("profile not found, please contact support")]
    DataIntegrity,

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username already registered")]
    UsernameTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::SlotUnavailable | AppError::SlotBooked | AppError::UsernameTaken => {
                StatusCode::CONFLICT
            }
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::DataIntegrity
            | AppError::Database(_)
            | AppError::PasswordHash(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Where the user should go next, mirroring the page each failure returns to.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            AppError::SlotUnavailable => Some("/cliente/agendar/"),
            AppError::Unauthenticated | AppError::InvalidCredentials => Some("/login/"),
            AppError::UsernameTaken | AppError::DataIntegrity => Some("/cadastro/"),
            _ => None,
        }
    }

    fn notice(&self) -> String {
        match self {
            AppError::Database(_) | AppError::PasswordHash(_) | AppError::Internal(_) => {
                "something went wrong, please try again".to_owned()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    level: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        let body = ErrorBody {
            level: "error",
            message: self.notice(),
            redirect: self.redirect(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
