//! Storage ports for the two record owners.
//!
//! The accounts service persists through [`AccountStore`], the
//! transactions service through [`TransactionStore`]. Each has a Postgres
//! implementation and an in-memory one used by standalone mode and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        account::Account,
        transaction::{Transaction, TransactionStatus},
    },
};

pub mod memory;
pub mod postgres;

/// Persistence for ledger accounts.
///
/// Implementations must give `apply_transfer` and `inactivate_stale`
/// exclusive access to every row they read-modify-write.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account_number_exists(&self, account_number: &str) -> Result<bool, AppError>;

    /// Insert a new account. Returns `false` when its account number is taken.
    async fn try_insert(&self, account: &Account) -> Result<bool, AppError>;

    async fn get(&self, account_id: Uuid) -> Result<Option<Account>, AppError>;

    /// All accounts of a user, oldest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError>;

    /// Debit `from` and credit `to` by `amount` as one unit.
    ///
    /// Returns both accounts after the update.
    ///
    /// # Errors
    ///
    /// - `NotFound`: either account is missing
    /// - `InsufficientFunds`: `amount` exceeds the source balance; nothing is written
    async fn apply_transfer(
        &self,
        from: Uuid,
        to: Uuid,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Account, Account), AppError>;

    /// Flip every ACTIVE account whose last transaction is older than
    /// `threshold` to INACTIVE. Returns the ids that changed.
    async fn inactivate_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<Uuid>, AppError>;
}

/// Persistence for transfer records.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, transaction: &Transaction) -> Result<(), AppError>;

    async fn get(&self, transaction_id: Uuid) -> Result<Option<Transaction>, AppError>;

    /// Take exclusive hold of one transfer record until the returned claim
    /// is finished or dropped. Other claimers of the same id wait, whichever
    /// process they run in. Returns `None` for an unknown id.
    async fn claim(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<Box<dyn ExecutionClaim>>, AppError>;

    /// Compare-and-set the status. Returns `false` when the stored status
    /// was not `expected`.
    async fn transition(
        &self,
        transaction_id: Uuid,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<bool, AppError>;

    /// Transfers where the account is source or destination, newest first.
    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError>;
}

/// Exclusive hold on a transfer record, obtained from [`TransactionStore::claim`].
///
/// Dropping a claim without finishing it releases the record unchanged.
#[async_trait]
pub trait ExecutionClaim: Send {
    /// The record as read when the claim was taken.
    fn transaction(&self) -> &Transaction;

    /// Compare-and-set the status from `INITIATED` to `next` and release
    /// the record. Returns `false` when it was no longer `INITIATED`.
    async fn finish(self: Box<Self>, next: TransactionStatus) -> Result<bool, AppError>;
}
