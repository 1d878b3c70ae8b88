//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the owning service
//! 3. Returns HTTP response (JSON, status code)

/// Account management endpoints
pub mod accounts;

/// Aggregated dashboard endpoint
pub mod dashboard;

/// Health check endpoint
pub mod health;

/// Transfer initiation, execution and history endpoints
pub mod transactions;
