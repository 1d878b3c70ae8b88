//! Business logic services.
//!
//! Services hold the core rules separated from HTTP handlers. Each one
//! owns its records through a store and reaches other services only
//! through the ports in [`crate::clients`].

pub mod account_ledger;
pub mod aggregation;
pub mod inactivation;
pub mod log_publisher;
pub mod transfer_coordinator;
