use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::notify::NotifyError;

/// Failures of the credential store seam.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => StoreError::Backend(e.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Email not found")]
    EmailNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password reset token is invalid or has expired.")]
    InvalidOrExpiredToken,

    #[error("Error sending email: {0}")]
    Delivery(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Backend(e) => AuthError::Storage(e),
        }
    }
}

impl From<NotifyError> for AuthError {
    fn from(e: NotifyError) -> Self {
        AuthError::Delivery(e.to_string())
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::DuplicateEmail
            | AuthError::EmailNotFound
            | AuthError::InvalidCredentials
            | AuthError::InvalidOrExpiredToken
            | AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::Delivery(_) | AuthError::Storage(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Client-facing error: `{ "success": false, "message": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let status = e.status_code();
        let message = match &e {
            AuthError::Storage(inner) | AuthError::Internal(inner) => {
                error!(error = %inner, "request failed");
                "Internal Server Error".to_string()
            }
            AuthError::Delivery(reason) => {
                error!(%reason, "reset email delivery failed");
                e.to_string()
            }
            _ => e.to_string(),
        };
        Self { status, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "request body rejected");
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "message": self.message })),
        )
            .into_response()
    }
}
