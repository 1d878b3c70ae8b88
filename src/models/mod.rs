//! Data models representing domain entities and wire types.
//!
//! Entities (`Account`, `Transaction`) are owned by exactly one service.
//! Request/response types are the JSON shapes exchanged over HTTP,
//! including between the services themselves.

/// Ledger account model
pub mod account;
/// Per-user dashboard view
pub mod dashboard;
/// Fixed-point money helpers
pub mod money;
/// Transfer transaction model
pub mod transaction;
