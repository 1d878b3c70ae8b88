//! Health check endpoint for service monitoring.

use crate::{db::DbPool, error::AppError};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the health check needs to know about this process.
#[derive(Clone)]
pub struct HealthState {
    /// Role name reported in the response
    pub service: &'static str,

    /// Present only for the database-backed roles
    pub pool: Option<DbPool>,
}

/// Health check response.
///
/// Returns service status and database connectivity.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Which role this process runs
    pub service: String,

    /// Database connection status (`"not_configured"` for roles without one)
    pub database: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Checks
///
/// - Database connectivity (executes simple query) when a pool is configured
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "accounts",
///   "database": "connected",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// # Response (500 Internal Server Error)
///
/// If database is unreachable, returns standard error response.
pub async fn health_check(
    State(health): State<HealthState>,
) -> Result<Json<HealthResponse>, AppError> {
    let database = match &health.pool {
        Some(pool) => {
            // Verify database connectivity with simple query
            sqlx::query("SELECT 1").execute(pool).await?;
            "connected"
        }
        None => "not_configured",
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        service: health.service.to_string(),
        database: database.to_string(),
        timestamp: Utc::now(),
    }))
}
