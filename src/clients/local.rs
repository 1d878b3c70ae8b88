//! In-process implementations of the service ports.
//!
//! Standalone mode runs all three components in one process; these
//! adapters let the coordinator and the gateway call the ledger and the
//! coordinator directly while keeping the same contracts as over HTTP.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::{HistoryClient, LedgerClient};
use crate::{
    error::AppError,
    models::{
        account::{AccountResponse, TransferConfirmation, TransferRequest},
        transaction::TransactionResponse,
    },
    services::{account_ledger::AccountLedger, transfer_coordinator::TransferCoordinator},
};

#[derive(Clone)]
pub struct LocalLedger(pub Arc<AccountLedger>);

#[async_trait]
impl LedgerClient for LocalLedger {
    async fn account(&self, account_id: Uuid) -> Result<AccountResponse, AppError> {
        Ok(self.0.get_account(account_id).await?.into())
    }

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<AccountResponse>, AppError> {
        let accounts = self.0.list_by_user(user_id).await?;
        Ok(accounts.into_iter().map(AccountResponse::from).collect())
    }

    async fn apply_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferConfirmation, AppError> {
        self.0.apply_transfer(request.clone()).await?;
        Ok(TransferConfirmation::applied())
    }
}

#[derive(Clone)]
pub struct LocalHistory(pub Arc<TransferCoordinator>);

#[async_trait]
impl HistoryClient for LocalHistory {
    async fn history(&self, account_id: Uuid) -> Result<Vec<TransactionResponse>, AppError> {
        let transactions = self.0.history(account_id).await?;
        Ok(transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect())
    }
}
