//! Error types and their mapping to HTTP responses.
//!
//! Domain failures carry their detail server-side; the response body only ever
//! holds a stable code and a message that is safe to show a client.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::users::repo::StoreError;

/// Why a bearer token was refused. Never shown to the client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("authorization scheme is not Bearer")]
    BadScheme,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token issuer or audience mismatch")]
    WrongAudience,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Hashing(_) | AppError::Signing(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Hashing(_) | AppError::Signing(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation => AppError::DuplicateEmail,
            StoreError::Backend(inner) => AppError::Internal(inner),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection, "rejected request body");
        AppError::Validation("Invalid request payload".into())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection, "rejected query string");
        AppError::Validation("Invalid query parameters".into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::DuplicateEmail => "User with this email already exists".into(),
            AppError::InvalidCredentials => "Invalid email or password".into(),
            AppError::Unauthorized(reason) => {
                warn!(reason = %reason, "request rejected by access guard");
                "Invalid or missing token".into()
            }
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::Hashing(detail) => {
                error!(error = %detail, "password hashing failed");
                "An internal error occurred".into()
            }
            AppError::Signing(detail) => {
                error!(error = %detail, "token signing failed");
                "An internal error occurred".into()
            }
            AppError::Internal(err) => {
                error!(error = ?err, "internal error");
                "An internal error occurred".into()
            }
        };

        let body = Json(ErrorResponse {
            error: true,
            code: self.code(),
            message,
        });
        (self.status(), body).into_response()
    }
}
