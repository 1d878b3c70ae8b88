//! TransferCoordinator - owner of transfer records.
//!
//! A transfer is opened with [`TransferCoordinator::initiate`], which only
//! records intent, and settled with [`TransferCoordinator::execute`], which
//! asks the AccountLedger to move the money and then finalizes the record.
//!
//! # Exclusivity
//!
//! Execute runs under a claim on the transfer record (see
//! [`TransactionStore::claim`]); with Postgres that is a row lock, so two
//! coordinators sharing one database are serialized too, and the second one
//! sees a terminal status. The final status write is a compare-and-set
//! from `INITIATED` inside the claim.
//!
//! If the ledger applied the transfer but the `SUCCESS` write fails, the
//! write is retried. Should every retry fail, the id is remembered as
//! settled and any further Execute of it is refused (and repairs the
//! status) instead of debiting again. That memory is per process: a
//! restart in this window still leaves the record `INITIATED`.

use chrono::Utc;
use dashmap::DashSet;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    clients::LedgerClient,
    error::AppError,
    models::{
        account::TransferRequest,
        money,
        transaction::{InitiateTransferRequest, Transaction, TransactionStatus},
    },
    repository::{ExecutionClaim, TransactionStore},
};

/// Extra attempts at recording `SUCCESS` after the ledger applied a transfer.
const SUCCESS_WRITE_RETRIES: u32 = 3;

/// Backoff step between those attempts; attempt `n` waits `n` steps.
const SUCCESS_WRITE_BACKOFF: Duration = Duration::from_millis(50);

pub struct TransferCoordinator {
    store: Arc<dyn TransactionStore>,
    ledger: Arc<dyn LedgerClient>,
    /// Applied by the ledger, status write still owed.
    settled_unrecorded: DashSet<Uuid>,
}

impl TransferCoordinator {
    pub fn new(store: Arc<dyn TransactionStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            store,
            ledger,
            settled_unrecorded: DashSet::new(),
        }
    }

    /// Record a new transfer in `INITIATED` state.
    ///
    /// No balance is touched here.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: non-positive or sub-cent amount, or source == destination
    /// - `NotFound`: either account is unknown to the ledger
    /// - `UpstreamUnavailable`: the ledger could not answer
    pub async fn initiate(
        &self,
        request: InitiateTransferRequest,
    ) -> Result<Transaction, AppError> {
        let amount = money::transfer_amount(request.amount)?;
        if request.from_account_id == request.to_account_id {
            return Err(AppError::InvalidRequest(
                "Cannot transfer to same account".to_string(),
            ));
        }

        self.ensure_account_exists(request.from_account_id).await?;
        self.ensure_account_exists(request.to_account_id).await?;

        let transaction = Transaction::initiate(
            request.from_account_id,
            request.to_account_id,
            amount,
            request.description,
            Utc::now(),
        );
        self.store.insert(&transaction).await?;

        tracing::info!(
            transaction_id = %transaction.transaction_id,
            from_account_id = %transaction.from_account_id,
            to_account_id = %transaction.to_account_id,
            amount = %transaction.amount,
            "Transaction initiated"
        );

        Ok(transaction)
    }

    /// Settle an `INITIATED` transfer.
    ///
    /// # Process
    ///
    /// 1. Claim the record and require `INITIATED`
    /// 2. Re-read the source balance from the ledger
    /// 3. Ask the ledger to apply the debit/credit pair
    /// 4. Finalize as `SUCCESS`, or as `FAILED` if step 2 or 3 failed
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such transaction
    /// - `InvalidState`: the transaction is already `SUCCESS` or `FAILED`,
    ///   or was settled earlier without its status being recorded
    /// - `InsufficientFunds`, `NotFound`, `UpstreamUnavailable`: settlement
    ///   failed. The record has been moved to `FAILED` before this returns.
    /// - `Internal`: the money moved but `SUCCESS` could not be recorded
    pub async fn execute(&self, transaction_id: Uuid) -> Result<Transaction, AppError> {
        let claim = self
            .store
            .claim(transaction_id)
            .await?
            .ok_or_else(|| AppError::transaction_not_found(transaction_id))?;
        let transaction = claim.transaction().clone();

        if self.settled_unrecorded.contains(&transaction_id) {
            self.repair_settled(claim).await;
            return Err(AppError::InvalidState(format!(
                "Transaction {transaction_id} is already {}",
                TransactionStatus::Success
            )));
        }

        if transaction.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "Transaction {} is already {}",
                transaction_id, transaction.status
            )));
        }

        match self.settle(&transaction).await {
            Ok(()) => {
                self.record_success(claim).await?;
                tracing::info!(transaction_id = %transaction_id, "Transaction executed");

                Ok(Transaction {
                    status: TransactionStatus::Success,
                    ..transaction
                })
            }
            Err(cause) => {
                if let Err(e) = self.finalize(claim, TransactionStatus::Failed).await {
                    tracing::error!(
                        transaction_id = %transaction_id,
                        error = %e,
                        "Could not record failed transaction"
                    );
                }
                tracing::warn!(
                    transaction_id = %transaction_id,
                    error = %cause,
                    "Transaction failed"
                );

                Err(cause)
            }
        }
    }

    async fn settle(&self, transaction: &Transaction) -> Result<(), AppError> {
        let source = self
            .ledger
            .account(transaction.from_account_id)
            .await
            .map_err(|e| missing_account(e, transaction.from_account_id))?;

        // Advisory; the ledger re-checks under its row lock
        if source.balance < transaction.amount {
            return Err(AppError::InsufficientFunds(format!(
                "Insufficient funds. Account balance: {}, Transfer amount: {}",
                source.balance, transaction.amount
            )));
        }

        self.ledger
            .apply_transfer(&TransferRequest {
                from_account_id: transaction.from_account_id,
                to_account_id: transaction.to_account_id,
                amount: transaction.amount,
            })
            .await?;

        Ok(())
    }

    /// Write `next` through the claim and release it.
    async fn finalize(
        &self,
        claim: Box<dyn ExecutionClaim>,
        next: TransactionStatus,
    ) -> Result<(), AppError> {
        if !TransactionStatus::Initiated.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "Illegal transition INITIATED -> {next}"
            )));
        }

        let transaction_id = claim.transaction().transaction_id;
        if !claim.finish(next).await? {
            tracing::error!(
                transaction_id = %transaction_id,
                next = next.as_str(),
                "Transaction finalized concurrently"
            );
            return Err(AppError::InvalidState(format!(
                "Transaction {transaction_id} is no longer INITIATED"
            )));
        }

        Ok(())
    }

    /// Record `SUCCESS` for a transfer the ledger has already applied,
    /// retrying the status write when storage fails.
    ///
    /// The id stays in `settled_unrecorded` only when every attempt fails.
    async fn record_success(&self, claim: Box<dyn ExecutionClaim>) -> Result<(), AppError> {
        let transaction_id = claim.transaction().transaction_id;
        self.settled_unrecorded.insert(transaction_id);

        let mut last_error = match self.finalize(claim, TransactionStatus::Success).await {
            Err(AppError::InvalidState(message)) => {
                self.settled_unrecorded.remove(&transaction_id);
                return Err(AppError::InvalidState(message));
            }
            Ok(()) => {
                self.settled_unrecorded.remove(&transaction_id);
                return Ok(());
            }
            Err(e) => e,
        };

        for attempt in 1..=SUCCESS_WRITE_RETRIES {
            tracing::warn!(
                transaction_id = %transaction_id,
                attempt,
                error = %last_error,
                "Retrying SUCCESS status write"
            );
            tokio::time::sleep(SUCCESS_WRITE_BACKOFF * attempt).await;

            let written = self
                .store
                .transition(
                    transaction_id,
                    TransactionStatus::Initiated,
                    TransactionStatus::Success,
                )
                .await;
            match written {
                Ok(true) => {
                    self.settled_unrecorded.remove(&transaction_id);
                    return Ok(());
                }
                Ok(false) => {
                    self.settled_unrecorded.remove(&transaction_id);
                    return Err(AppError::InvalidState(format!(
                        "Transaction {transaction_id} is no longer INITIATED"
                    )));
                }
                Err(e) => last_error = e,
            }
        }

        tracing::error!(
            transaction_id = %transaction_id,
            error = %last_error,
            "Transfer applied but SUCCESS could not be recorded"
        );
        Err(AppError::Internal(format!(
            "Transaction {transaction_id} was applied but its status could not be recorded"
        )))
    }

    /// Retry the owed `SUCCESS` write for a transfer already settled here.
    async fn repair_settled(&self, claim: Box<dyn ExecutionClaim>) {
        let transaction_id = claim.transaction().transaction_id;
        match claim.finish(TransactionStatus::Success).await {
            Ok(_) => {
                self.settled_unrecorded.remove(&transaction_id);
                tracing::info!(transaction_id = %transaction_id, "Recorded owed SUCCESS status");
            }
            Err(e) => tracing::error!(
                transaction_id = %transaction_id,
                error = %e,
                "SUCCESS status still could not be recorded"
            ),
        }
    }

    /// Transfers touching `account_id`, newest first.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the account is unknown to the ledger, or has no transfers
    pub async fn history(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        self.ensure_account_exists(account_id).await?;

        let transactions = self.store.list_for_account(account_id).await?;
        if transactions.is_empty() {
            return Err(AppError::NotFound(format!(
                "No transactions found for account: {account_id}"
            )));
        }

        Ok(transactions)
    }

    async fn ensure_account_exists(&self, account_id: Uuid) -> Result<(), AppError> {
        self.ledger
            .account(account_id)
            .await
            .map(|_| ())
            .map_err(|e| missing_account(e, account_id))
    }
}

/// Normalize a ledger `NotFound` into this service's wording.
fn missing_account(error: AppError, account_id: Uuid) -> AppError {
    match error {
        AppError::NotFound(_) => AppError::account_not_found(account_id),
        other => other,
    }
}
