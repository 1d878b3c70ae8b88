//! In-memory stores for standalone mode and tests.
//!
//! Each store keeps its map behind one `RwLock`. Writers hold the lock for
//! the whole read-modify-write, which gives `apply_transfer` and the stale
//! sweep the same per-row exclusivity the Postgres row locks provide.
//! Transfer claims are per-id async mutexes kept in a `DashMap`; an entry
//! lives only while someone holds or waits for it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{AccountStore, ExecutionClaim, TransactionStore};
use crate::{
    error::AppError,
    models::{
        account::{Account, AccountStatus},
        transaction::{Transaction, TransactionStatus},
    },
};

#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn account_number_exists(&self, account_number: &str) -> Result<bool, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .any(|a| a.account_number == account_number))
    }

    async fn try_insert(&self, account: &Account) -> Result<bool, AppError> {
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|a| a.account_number == account.account_number)
        {
            return Ok(false);
        }
        accounts.insert(account.account_id, account.clone());
        Ok(true)
    }

    async fn get(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&account_id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let accounts = self.accounts.read().await;
        let mut owned: Vec<Account> = accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|a| a.created_at);
        Ok(owned)
    }

    async fn apply_transfer(
        &self,
        from: Uuid,
        to: Uuid,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(Account, Account), AppError> {
        let mut accounts = self.accounts.write().await;

        let mut source = accounts
            .get(&from)
            .cloned()
            .ok_or_else(|| AppError::account_not_found(from))?;
        let mut destination = accounts
            .get(&to)
            .cloned()
            .ok_or_else(|| AppError::account_not_found(to))?;

        // Work on copies; the map only changes once both sides succeed
        source.debit(amount, at)?;
        destination.credit(amount, at)?;

        accounts.insert(from, source.clone());
        accounts.insert(to, destination.clone());

        Ok((source, destination))
    }

    async fn inactivate_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let mut accounts = self.accounts.write().await;
        let mut changed = Vec::new();

        for account in accounts.values_mut() {
            if account.status == AccountStatus::Active && account.last_transaction_at < threshold
            {
                account.status = AccountStatus::Inactive;
                changed.push(account.account_id);
            }
        }

        Ok(changed)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
    claims: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the claim entry once nobody holds or awaits it.
    fn release(&self, transaction_id: Uuid) {
        self.claims
            .remove_if(&transaction_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

struct InMemoryClaim {
    store: InMemoryTransactionStore,
    transaction: Transaction,
    guard: Option<OwnedMutexGuard<()>>,
}

#[async_trait]
impl ExecutionClaim for InMemoryClaim {
    fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    async fn finish(self: Box<Self>, next: TransactionStatus) -> Result<bool, AppError> {
        self.store
            .transition(
                self.transaction.transaction_id,
                TransactionStatus::Initiated,
                next,
            )
            .await
    }
}

impl Drop for InMemoryClaim {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.store.release(self.transaction.transaction_id);
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, transaction: &Transaction) -> Result<(), AppError> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(transaction.transaction_id, transaction.clone());
        Ok(())
    }

    async fn get(&self, transaction_id: Uuid) -> Result<Option<Transaction>, AppError> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&transaction_id).cloned())
    }

    async fn claim(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<Box<dyn ExecutionClaim>>, AppError> {
        let lock = self.claims.entry(transaction_id).or_default().value().clone();
        let guard = lock.lock_owned().await;

        let Some(transaction) = self.get(transaction_id).await? else {
            drop(guard);
            self.release(transaction_id);
            return Ok(None);
        };

        Ok(Some(Box::new(InMemoryClaim {
            store: self.clone(),
            transaction,
            guard: Some(guard),
        })))
    }

    async fn transition(
        &self,
        transaction_id: Uuid,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<bool, AppError> {
        let mut transactions = self.transactions.write().await;
        match transactions.get_mut(&transaction_id) {
            Some(tx) if tx.status == expected => {
                tx.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_for_account(&self, account_id: Uuid) -> Result<Vec<Transaction>, AppError> {
        let transactions = self.transactions.read().await;
        let mut matching: Vec<Transaction> = transactions
            .values()
            .filter(|t| t.involves(account_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountType;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn account(number: &str, balance: Decimal) -> Account {
        Account::open(
            Uuid::new_v4(),
            number.to_string(),
            AccountType::Savings,
            balance,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_try_insert_rejects_duplicate_account_number() {
        let store = InMemoryAccountStore::new();
        assert!(store.try_insert(&account("0000000001", dec!(0))).await.unwrap());
        assert!(!store.try_insert(&account("0000000001", dec!(5))).await.unwrap());
        assert!(store.account_number_exists("0000000001").await.unwrap());
        assert!(!store.account_number_exists("0000000002").await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_transfer_leaves_map_untouched_on_overdraft() {
        let store = InMemoryAccountStore::new();
        let a = account("0000000001", dec!(10.00));
        let b = account("0000000002", dec!(50.00));
        store.try_insert(&a).await.unwrap();
        store.try_insert(&b).await.unwrap();

        let result = store
            .apply_transfer(a.account_id, b.account_id, dec!(30.00), Utc::now())
            .await;
        assert!(matches!(result, Err(AppError::InsufficientFunds(_))));

        assert_eq!(store.get(a.account_id).await.unwrap().unwrap(), a);
        assert_eq!(store.get(b.account_id).await.unwrap().unwrap(), b);
    }

    #[tokio::test]
    async fn test_apply_transfer_missing_destination() {
        let store = InMemoryAccountStore::new();
        let a = account("0000000001", dec!(10.00));
        store.try_insert(&a).await.unwrap();

        let result = store
            .apply_transfer(a.account_id, Uuid::new_v4(), dec!(1.00), Utc::now())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(store.get(a.account_id).await.unwrap().unwrap().balance, dec!(10.00));
    }

    #[tokio::test]
    async fn test_inactivate_stale_only_touches_old_active_accounts() {
        let store = InMemoryAccountStore::new();
        let now = Utc::now();

        let mut old = account("0000000001", dec!(0));
        old.last_transaction_at = now - Duration::hours(48);
        let fresh = account("0000000002", dec!(0));
        store.try_insert(&old).await.unwrap();
        store.try_insert(&fresh).await.unwrap();

        let changed = store
            .inactivate_stale(now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(changed, vec![old.account_id]);

        // Second pass finds nothing new
        let changed = store
            .inactivate_stale(now - Duration::hours(24))
            .await
            .unwrap();
        assert!(changed.is_empty());
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = InMemoryTransactionStore::new();
        let tx = Transaction::initiate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(1.00),
            None,
            Utc::now(),
        );
        store.insert(&tx).await.unwrap();

        assert!(store
            .transition(tx.transaction_id, TransactionStatus::Initiated, TransactionStatus::Success)
            .await
            .unwrap());
        assert!(!store
            .transition(tx.transaction_id, TransactionStatus::Initiated, TransactionStatus::Failed)
            .await
            .unwrap());
        assert_eq!(
            store.get(tx.transaction_id).await.unwrap().unwrap().status,
            TransactionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_list_for_account_newest_first() {
        let store = InMemoryTransactionStore::new();
        let a = Uuid::new_v4();
        let now = Utc::now();

        let earlier = now - Duration::minutes(5);
        let other = Uuid::new_v4();
        let older = Transaction::initiate(a, Uuid::new_v4(), dec!(1.00), None, earlier);
        let newer = Transaction::initiate(Uuid::new_v4(), a, dec!(2.00), None, now);
        let unrelated = Transaction::initiate(other, Uuid::new_v4(), dec!(3.00), None, now);
        for tx in [&older, &newer, &unrelated] {
            store.insert(tx).await.unwrap();
        }

        let history = store.list_for_account(a).await.unwrap();
        assert_eq!(history, vec![newer, older]);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive_until_finished() {
        let store = InMemoryTransactionStore::new();
        let tx = Transaction::initiate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(1.00),
            None,
            Utc::now(),
        );
        store.insert(&tx).await.unwrap();

        let held = store.claim(tx.transaction_id).await.unwrap().unwrap();
        assert_eq!(held.transaction().status, TransactionStatus::Initiated);

        let contender = {
            let store = store.clone();
            let id = tx.transaction_id;
            tokio::spawn(async move { store.claim(id).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        assert!(held.finish(TransactionStatus::Success).await.unwrap());

        // The waiter sees the status written by the first holder
        let next = contender.await.unwrap().unwrap().unwrap();
        assert_eq!(next.transaction().status, TransactionStatus::Success);
        assert!(!next.finish(TransactionStatus::Failed).await.unwrap());
        assert!(store.claims.is_empty());
    }

    #[tokio::test]
    async fn test_claim_unknown_or_dropped_leaves_no_entry() {
        let store = InMemoryTransactionStore::new();
        assert!(store.claim(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.claims.is_empty());

        let tx = Transaction::initiate(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(1.00),
            None,
            Utc::now(),
        );
        store.insert(&tx).await.unwrap();
        drop(store.claim(tx.transaction_id).await.unwrap());

        assert!(store.claims.is_empty());
        assert_eq!(
            store.get(tx.transaction_id).await.unwrap().unwrap().status,
            TransactionStatus::Initiated
        );
    }
}
