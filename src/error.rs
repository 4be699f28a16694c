//! Unified application error model and HTTP mapping.
//!
//! Module-level errors (`TokenError`, `AuthError`, `StoreError`) converge
//! here; `AppError` owns the status mapping and the response shape. Bodies
//! for 401/403/400 are JSON arrays of human-readable message strings, the
//! wire contract existing clients depend on. Internal errors are logged with
//! full context server-side and reported to the client as an opaque message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{debug, error};

use crate::identity::{AuthError, Denial, Role};
use crate::store::StoreError;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: requires {required} role")]
    Forbidden { required: Role },
    #[error("validation failed")]
    Validation(Vec<String>),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-visible message list. Internal detail never crosses here.
    fn messages(&self) -> Vec<String> {
        match self {
            AppError::Unauthenticated(msg) => vec![msg.clone()],
            AppError::Forbidden { required } => {
                vec![format!("Access denied: requires {required} role")]
            }
            AppError::Validation(errors) => errors.clone(),
            AppError::Conflict(msg) => vec![msg.clone()],
            AppError::NotFound(msg) => vec![msg.clone()],
            AppError::Internal(_) => vec!["Internal server error".to_string()],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            error!(status = %status, "request failed: {self}");
        } else {
            // Client faults (including validation) are not security events.
            debug!(status = %status, "request rejected: {self}");
        }
        (status, Json(self.messages())).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredential => {
                AppError::Unauthenticated("Authentication required".to_string())
            }
            AuthError::InvalidToken | AuthError::UnknownUser => {
                AppError::Unauthenticated("Invalid token".to_string())
            }
            AuthError::Inactive => {
                AppError::Unauthenticated("Account is inactive".to_string())
            }
            AuthError::Store(msg) => AppError::Internal(msg),
        }
    }
}

impl From<Denial> for AppError {
    fn from(d: Denial) -> Self {
        match d {
            Denial::Unauthenticated => {
                AppError::Unauthenticated("Authentication required".to_string())
            }
            Denial::InsufficientRole { required } => AppError::Forbidden { required },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            dup @ StoreError::Duplicate(_) => AppError::Conflict(dup.to_string()),
            StoreError::NotFound => AppError::NotFound("User not found".to_string()),
            StoreError::Unavailable(msg) => AppError::Internal(msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired | TokenError::InvalidSignature => {
                AppError::Unauthenticated("Invalid token".to_string())
            }
            TokenError::Signing(msg) => AppError::Internal(msg),
        }
    }
}
