//! HTTP middleware components.
//!
//! Middleware are functions that run around route handlers.
//! They can:
//! - Log requests
//! - Modify request/response
//! - Short-circuit requests

/// Request/response audit publishing
pub mod audit;
