//! Error types and HTTP error response handling.
//!
//! This module defines the error taxonomy shared by the ledger, the
//! coordinator and the gateway, and how each error is rendered as an
//! HTTP response with a uniform JSON body.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Application-wide error type.
///
/// Every component surfaces one of these to its direct caller. The HTTP
/// boundary maps each variant to a status code; the HTTP clients map a
/// remote error body back into the same variant, so a typed failure
/// survives a hop between services.
///
/// # Error Categories
///
/// - **Validation**: malformed or out-of-range input
/// - **Resource**: account, transaction, user or history absent
/// - **Business Rules**: insufficient funds, illegal state transition
/// - **Dependencies**: downstream service unavailable, storage failure
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Requested account, transaction, user or history does not exist.
    ///
    /// Returns HTTP 404 Not Found (400 on endpoints wrapped in [`BadRequest`]).
    #[error("{0}")]
    NotFound(String),

    /// Source account balance is lower than the transfer amount.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InsufficientFunds(String),

    /// Transaction is not in a state from which the operation is legal.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidState(String),

    /// A downstream service failed, timed out or returned garbage.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Invariant broken inside this service (e.g. account number space exhausted).
    #[error("{0}")]
    Internal(String),

    /// Database operation failed (e.g. connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn account_not_found(account_id: uuid::Uuid) -> Self {
        AppError::NotFound(format!("Account with ID {account_id} not found"))
    }

    pub fn transaction_not_found(transaction_id: uuid::Uuid) -> Self {
        AppError::NotFound(format!("Transaction with ID {transaction_id} not found"))
    }

    pub fn user_not_found(user_id: uuid::Uuid) -> Self {
        AppError::NotFound(format!("User with ID {user_id} does not exist"))
    }

    /// Stable machine-readable code carried in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::InsufficientFunds(_) => "insufficient_funds",
            AppError::InvalidState(_) => "invalid_state",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::Internal(_) | AppError::Database(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_)
            | AppError::InsufficientFunds(_)
            | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Rebuild a typed error from a remote service's error body.
    ///
    /// Unknown codes and 5xx statuses collapse into `UpstreamUnavailable`.
    pub fn from_remote(status: StatusCode, body: ErrorBody) -> Self {
        match body.error.as_str() {
            "validation_error" => AppError::InvalidRequest(body.message),
            "not_found" => AppError::NotFound(body.message),
            "insufficient_funds" => AppError::InsufficientFunds(body.message),
            "invalid_state" => AppError::InvalidState(body.message),
            _ if status == StatusCode::NOT_FOUND => AppError::NotFound(body.message),
            _ => AppError::UpstreamUnavailable(format!(
                "Upstream responded {}: {}",
                status.as_u16(),
                body.message
            )),
        }
    }

    fn into_body(self, status: StatusCode) -> (StatusCode, Json<ErrorBody>) {
        let message = match self {
            // Hide storage details from clients
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database error");
                "An internal error occurred".to_string()
            }
            ref other => other.to_string(),
        };

        let body = ErrorBody {
            status: status.as_u16(),
            error: self.code().to_string(),
            message,
        };

        (status, Json(body))
    }
}

/// Uniform error body.
///
/// ```json
/// {
///   "status": 400,
///   "error": "insufficient_funds",
///   "message": "Insufficient funds. Account balance: 10.00, Transfer amount: 30.00"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    pub message: String,
}

/// Convert AppError into an HTTP response.
///
/// # Status Code Mapping
///
/// - `InvalidRequest`, `InsufficientFunds`, `InvalidState` → 400 Bad Request
/// - `NotFound` → 404 Not Found
/// - `UpstreamUnavailable` → 502 Bad Gateway
/// - `Internal`, `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        self.into_body(status).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Error wrapper for endpoints that report every business failure as 400.
///
/// The write endpoints (`POST /accounts`, `PUT /accounts/transfer`, the
/// transfer initiation and execution routes) answer a missing account or
/// user with 400 rather than 404. Upstream and storage failures keep their
/// own status.
#[derive(Debug)]
pub struct BadRequest(pub AppError);

impl From<AppError> for BadRequest {
    fn from(error: AppError) -> Self {
        BadRequest(error)
    }
}

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        let status = match self.0.status() {
            StatusCode::NOT_FOUND => StatusCode::BAD_REQUEST,
            other => other,
        };
        self.0.into_body(status).into_response()
    }
}
