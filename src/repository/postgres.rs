//! Postgres-backed stores.
//!
//! # Locking
//!
//! `apply_transfer` runs in one database transaction and locks both
//! account rows with `FOR UPDATE`, always in `account_id` order so two
//! opposite transfers cannot deadlock. The stale sweep is a single guarded
//! `UPDATE`; Postgres re-checks its `WHERE` clause against any row a
//! concurrent transfer just committed, so a freshly used account is
//! skipped instead of being inactivated with a stale view.
//!
//! A transfer claim is an open database transaction holding the record's
//! row lock (`SELECT … FOR UPDATE`). Coordinators in other processes block
//! on the same row until the claim commits its status or is rolled back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Postgres;
use uuid::Uuid;

use super::{AccountStore, ExecutionClaim, TransactionStore};
use crate::{
    db::DbPool,
    error::AppError,
    models::{
        account::Account,
        transaction::{Transaction, TransactionStatus},
    },
};

#[derive(Clone)]
pub struct PgAccountStore {
    pool: DbPool,
}

impl PgAccountStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn account_number_exists(&self, account_number: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE account_number = $1)")
                .bind(account_number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn try_insert(&self, account: &Account) -> Result<bool, AppError> {
        // Unique constraint on account_number closes the check-then-insert race
        let inserted = sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id,
                user_id,
                account_number,
                account_type,
                balance,
                status,
                created_at,
                last_transaction_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (account_number) DO NOTHING
            "#,
        )
        .bind(account.account_id)
        .bind(account.user_id)
        .bind(&account.account_number)
        .bind(account.account_type.as_str())
        .bind(account.balance)
        .bind(account.status.as_str())
        .bind(account.created_at)
        .bind(account.last_transaction_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted == 1)
    }

    async fn get(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, user_id, account_number, account_type, balance,
                   status, created_at, last_transaction_at
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, user_id, account_number, account_type, balance,
                   status, created_at, last_transaction_at
            FROM accounts
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    async fn apply_transfer(
        &self,
        from: Uuid,
        to: Uuid,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Account, Account), AppError> {
        // Dropping `tx` on any early return rolls back
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, user_id, account_number, account_type, balance,
                   status, created_at, last_transaction_at
            FROM accounts
            WHERE account_id = ANY($1)
            ORDER BY account_id
            FOR UPDATE
            "#,
        )
        .bind(vec![from, to])
        .fetch_all(&mut *tx)
        .await?;

        let mut source = locked
            .iter()
            .find(|a| a.account_id == from)
            .cloned()
            .ok_or_else(|| AppError::account_not_found(from))?;
        let mut destination = locked
            .iter()
            .find(|a| a.account_id == to)
            .cloned()
            .ok_or_else(|| AppError::account_not_found(to))?;

        source.debit(amount, at)?;
        destination.credit(amount, at)?;

        for account in [&source, &destination] {
            sqlx::query(
                "UPDATE accounts SET balance = $1, last_transaction_at = $2 WHERE account_id = $3",
            )
            .bind(account.balance)
            .bind(account.last_transaction_at)
            .bind(account.account_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok((source, destination))
    }

    async fn inactivate_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET status = 'INACTIVE'
            WHERE status = 'ACTIVE' AND last_transaction_at < $1
            RETURNING account_id
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[derive(Clone)]
pub struct PgTransactionStore {
    pool: DbPool,
}

impl PgTransactionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PgExecutionClaim {
    tx: sqlx::Transaction<'static, Postgres>,
    transaction: Transaction,
}

#[async_trait]
impl ExecutionClaim for PgExecutionClaim {
    fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    async fn finish(self: Box<Self>, next: TransactionStatus) -> Result<bool, AppError> {
        let PgExecutionClaim {
            mut tx,
            transaction,
        } = *self;

        let result = sqlx::query(
            "UPDATE transactions SET status = $1 WHERE transaction_id = $2 AND status = $3",
        )
        .bind(next.as_str())
        .bind(transaction.transaction_id)
        .bind(TransactionStatus::Initiated.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn insert(&self, transaction: &Transaction) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_id,
                from_account_id,
                to_account_id,
                amount,
                description,
                status,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(transaction.transaction_id)
        .bind(transaction.from_account_id)
        .bind(transaction.to_account_id)
        .bind(transaction.amount)
        .bind(&transaction.description)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, transaction_id: Uuid) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT transaction_id, from_account_id, to_account_id, amount,
                   description, status, created_at
            FROM transactions
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn claim(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<Box<dyn ExecutionClaim>>, AppError> {
        let mut tx = self.pool.begin().await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT transaction_id, from_account_id, to_account_id, amount,
                   description, status, created_at
            FROM transactions
            WHERE transaction_id = $1
            FOR UPDATE
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping `tx` rolls back and releases the row lock
        Ok(transaction.map(|transaction| {
            Box::new(PgExecutionClaim { tx, transaction }) as Box<dyn ExecutionClaim>
        }))
    }

    async fn transition(
        &self,
        transaction_id: Uuid,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = $1 WHERE transaction_id = $2 AND status = $3",
        )
        .bind(next.as_str())
        .bind(transaction_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        let transactions = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT transaction_id, from_account_id, to_account_id, amount,
                   description, status, created_at
            FROM transactions
            WHERE from_account_id = $1 OR to_account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }
}
