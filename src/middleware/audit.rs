//! Request/response audit middleware.
//!
//! Every routed request has its body copied to the audit log before the
//! handler runs, and every response body is copied after. Publishing is
//! fire-and-forget; only an unreadable request body fails the request. A
//! response larger than [`MAX_AUDITED_BODY`] is passed through unaudited.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    services::log_publisher::{AuditLog, MessageType},
};

/// Largest request body accepted, and largest response body published.
const MAX_AUDITED_BODY: usize = 2 * 1024 * 1024;

/// Audit middleware function.
///
/// # Flow
///
/// 1. Buffer the request body and publish it as a `Request` message
/// 2. Rebuild the request and call the next handler
/// 3. Buffer the response body and publish it as a `Response` message,
///    unless it exceeds [`MAX_AUDITED_BODY`]
/// 4. Rebuild and return the response unchanged
pub async fn audit_middleware(
    State(audit): State<AuditLog>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_AUDITED_BODY)
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Unreadable request body: {e}")))?;

    if !bytes.is_empty() {
        audit.record(MessageType::Request, &bytes);
    }

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    let (parts, body) = response.into_parts();
    // Handlers produce their whole body up front, so this holds nothing new
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Could not buffer response body");
            return Ok(AppError::Internal("Response body unavailable".to_string()).into_response());
        }
    };

    if bytes.len() > MAX_AUDITED_BODY {
        tracing::warn!(
            size = bytes.len(),
            limit = MAX_AUDITED_BODY,
            "Response body too large to audit"
        );
    } else {
        audit.record(MessageType::Response, &bytes);
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
