//! Ports to the services this process depends on.
//!
//! Each trait is the narrow contract one component needs from another.
//! [`http`] implements them over the wire with `reqwest`; [`local`]
//! implements them in-process for standalone mode.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::{AccountResponse, TransferConfirmation, TransferRequest},
        dashboard::UserProfile,
        transaction::TransactionResponse,
    },
};

pub mod http;
pub mod local;

/// "Does user X exist" lookup against the user-identity service.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, AppError>;
}

/// Profile lookup against the user-identity service.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError>;
}

/// What the coordinator and the gateway need from the AccountLedger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn account(&self, account_id: Uuid) -> Result<AccountResponse, AppError>;

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<AccountResponse>, AppError>;

    async fn apply_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferConfirmation, AppError>;
}

/// Transfer history lookup against the TransferCoordinator.
#[async_trait]
pub trait HistoryClient: Send + Sync {
    async fn history(&self, account_id: Uuid) -> Result<Vec<TransactionResponse>, AppError>;
}
