//! AggregationGateway - the per-user dashboard.
//!
//! The profile is the only call whose failure fails the request. The
//! account list and every per-account history lookup degrade to "nothing
//! to show" instead, so one slow or broken dependency never blanks the page.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    clients::{HistoryClient, LedgerClient, ProfileProvider},
    error::AppError,
    models::{
        account::AccountResponse,
        dashboard::{DashboardAccount, DashboardResponse},
        transaction::TransactionResponse,
    },
};

pub struct AggregationGateway {
    profiles: Arc<dyn ProfileProvider>,
    ledger: Arc<dyn LedgerClient>,
    history: Arc<dyn HistoryClient>,
    branch_timeout: Duration,
}

impl AggregationGateway {
    pub fn new(
        profiles: Arc<dyn ProfileProvider>,
        ledger: Arc<dyn LedgerClient>,
        history: Arc<dyn HistoryClient>,
        branch_timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            ledger,
            history,
            branch_timeout,
        }
    }

    /// Build the dashboard for one user.
    ///
    /// # Process
    ///
    /// 1. Fetch the profile (errors propagate)
    /// 2. Fetch the account list (errors degrade to profile only)
    /// 3. Fetch every account's history concurrently, one task per account
    /// 4. Wait for all of them and merge
    ///
    /// # Errors
    ///
    /// - `NotFound`: the user does not exist
    /// - `UpstreamUnavailable`: the profile could not be fetched
    pub async fn dashboard(&self, user_id: Uuid) -> Result<DashboardResponse, AppError> {
        let profile = self.profiles.profile(user_id).await?;
        let response = DashboardResponse::profile_only(profile);

        let accounts = match self.ledger.accounts_for_user(user_id).await {
            Ok(accounts) => accounts,
            Err(AppError::NotFound(_)) => return Ok(response),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Account list unavailable, serving profile only"
                );
                return Ok(response);
            }
        };

        let accounts = self.with_histories(accounts).await;
        Ok(response.with_accounts(accounts))
    }

    async fn with_histories(&self, accounts: Vec<AccountResponse>) -> Vec<DashboardAccount> {
        let tasks: Vec<_> = accounts
            .iter()
            .map(|account| {
                let history = Arc::clone(&self.history);
                let timeout = self.branch_timeout;
                let account_id = account.account_id;
                tokio::spawn(async move { fetch_history(history, account_id, timeout).await })
            })
            .collect();

        let results = join_all(tasks).await;

        accounts
            .into_iter()
            .zip(results)
            .map(|(account, joined)| {
                let transactions = joined.unwrap_or_else(|e| {
                    tracing::error!(
                        account_id = %account.account_id,
                        error = %e,
                        "History task aborted"
                    );
                    Vec::new()
                });
                DashboardAccount::new(account, transactions)
            })
            .collect()
    }
}

/// One fan-out branch. Never fails: any error or timeout is an empty list.
async fn fetch_history(
    history: Arc<dyn HistoryClient>,
    account_id: Uuid,
    timeout: Duration,
) -> Vec<TransactionResponse> {
    match tokio::time::timeout(timeout, history.history(account_id)).await {
        Ok(Ok(transactions)) => transactions,
        Ok(Err(AppError::NotFound(_))) => Vec::new(),
        Ok(Err(e)) => {
            tracing::warn!(account_id = %account_id, error = %e, "History lookup failed");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(
                account_id = %account_id,
                timeout_ms = timeout.as_millis() as u64,
                "History lookup timed out"
            );
            Vec::new()
        }
    }
}
