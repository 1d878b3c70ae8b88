//! AccountLedger - the component of record for account balances.
//!
//! This service handles:
//! - Opening accounts with collision-checked 10-digit account numbers
//! - Account lookups by id and by owning user
//! - `ApplyTransfer`: the debit/credit pair requested by the coordinator
//! - The stale-account sweep (driven by [`super::inactivation`])

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    clients::UserDirectory,
    error::AppError,
    models::{
        account::{Account, CreateAccountRequest, TransferRequest},
        money,
    },
    repository::AccountStore,
};

/// Account numbers are drawn uniformly from `0..ACCOUNT_NUMBER_SPACE`.
const ACCOUNT_NUMBER_SPACE: u64 = 10_000_000_000;

/// Draws before giving up on finding a free account number.
const MAX_ACCOUNT_NUMBER_ATTEMPTS: usize = 32;

pub struct AccountLedger {
    store: Arc<dyn AccountStore>,
    users: Arc<dyn UserDirectory>,
}

impl AccountLedger {
    pub fn new(store: Arc<dyn AccountStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    /// Open a new ACTIVE account for an existing user.
    ///
    /// # Process
    ///
    /// 1. Validate the opening balance
    /// 2. Ask the user-identity service whether the user exists
    /// 3. Draw account numbers until one is free and the insert wins
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: negative or sub-cent opening balance
    /// - `NotFound`: the user does not exist
    /// - `UpstreamUnavailable`: the user-identity service could not answer
    pub async fn create_account(&self, request: CreateAccountRequest) -> Result<Account, AppError> {
        let balance = money::opening_balance(request.initial_balance)?;

        if !self.users.user_exists(request.user_id).await? {
            return Err(AppError::user_not_found(request.user_id));
        }

        for _ in 0..MAX_ACCOUNT_NUMBER_ATTEMPTS {
            let account_number = generate_account_number();
            if self.store.account_number_exists(&account_number).await? {
                continue;
            }

            let account = Account::open(
                request.user_id,
                account_number,
                request.account_type,
                balance,
                Utc::now(),
            );

            // A concurrent insert may still take the number between check and insert
            if self.store.try_insert(&account).await? {
                tracing::info!(
                    account_id = %account.account_id,
                    user_id = %account.user_id,
                    account_type = account.account_type.as_str(),
                    "Account created"
                );
                return Ok(account);
            }
            tracing::debug!(account_number = %account.account_number, "Account number collision");
        }

        Err(AppError::Internal(
            "Could not allocate a unique account number".to_string(),
        ))
    }

    pub async fn get_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        self.store
            .get(account_id)
            .await?
            .ok_or_else(|| AppError::account_not_found(account_id))
    }

    /// All accounts of a user, oldest first.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the user does not exist, or has no accounts
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        if !self.users.user_exists(user_id).await? {
            return Err(AppError::user_not_found(user_id));
        }

        let accounts = self.store.list_by_user(user_id).await?;
        if accounts.is_empty() {
            return Err(AppError::NotFound(format!(
                "No accounts found for user: {user_id}"
            )));
        }

        Ok(accounts)
    }

    /// Debit the source and credit the destination.
    ///
    /// The funds check runs under the store's row lock, so it is the
    /// authoritative one; the coordinator's earlier check is advisory.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: non-positive or oversized amount, or source == destination
    /// - `NotFound`: either account is missing
    /// - `InsufficientFunds`: amount exceeds the source balance
    /// - `InvalidRequest`: the credit would push the destination past the
    ///   largest storable balance; nothing is written
    pub async fn apply_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<(Account, Account), AppError> {
        let amount = money::transfer_amount(request.amount)?;
        if request.from_account_id == request.to_account_id {
            return Err(AppError::InvalidRequest(
                "Cannot transfer to same account".to_string(),
            ));
        }

        let (from, to) = self
            .store
            .apply_transfer(
                request.from_account_id,
                request.to_account_id,
                amount,
                Utc::now(),
            )
            .await?;

        tracing::info!(
            from_account_id = %from.account_id,
            to_account_id = %to.account_id,
            amount = %amount,
            "Account balances updated"
        );

        Ok((from, to))
    }

    /// Inactivate every ACTIVE account idle for longer than `stale_after`.
    pub async fn inactivate_stale_accounts(
        &self,
        stale_after: chrono::Duration,
    ) -> Result<Vec<Uuid>, AppError> {
        let threshold = Utc::now() - stale_after;
        let inactivated = self.store.inactivate_stale(threshold).await?;

        for account_id in &inactivated {
            tracing::info!(account_id = %account_id, "Inactivated stale account");
        }

        Ok(inactivated)
    }
}

/// Draw a zero-padded 10-digit account number.
pub fn generate_account_number() -> String {
    let n = rand::rng().random_range(0..ACCOUNT_NUMBER_SPACE);
    format!("{n:010}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::account::{AccountStatus, AccountType},
        repository::memory::InMemoryAccountStore,
        test_support::StaticUsers,
    };
    use async_trait::async_trait;
    use chrono::DateTime;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
    };

    /// Reports the first `taken` numbers as existing and loses the first
    /// `stolen` insert races, then behaves like the in-memory store.
    #[derive(Default)]
    struct CollidingStore {
        inner: InMemoryAccountStore,
        taken: usize,
        stolen: usize,
        exists_calls: AtomicUsize,
        insert_calls: AtomicUsize,
    }

    #[async_trait]
    impl AccountStore for CollidingStore {
        async fn account_number_exists(&self, account_number: &str) -> Result<bool, AppError> {
            if self.exists_calls.fetch_add(1, Ordering::SeqCst) < self.taken {
                return Ok(true);
            }
            self.inner.account_number_exists(account_number).await
        }

        async fn try_insert(&self, account: &Account) -> Result<bool, AppError> {
            if self.insert_calls.fetch_add(1, Ordering::SeqCst) < self.stolen {
                return Ok(false);
            }
            self.inner.try_insert(account).await
        }

        async fn get(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
            self.inner.get(account_id).await
        }

        async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
            self.inner.list_by_user(user_id).await
        }

        async fn apply_transfer(
            &self,
            from: Uuid,
            to: Uuid,
            amount: Decimal,
            at: DateTime<Utc>,
        ) -> Result<(Account, Account), AppError> {
            self.inner.apply_transfer(from, to, amount, at).await
        }

        async fn inactivate_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
            self.inner.inactivate_stale(threshold).await
        }
    }

    fn ledger_with(users: StaticUsers) -> (AccountLedger, InMemoryAccountStore) {
        let store = InMemoryAccountStore::new();
        let ledger = AccountLedger::new(Arc::new(store.clone()), Arc::new(users));
        (ledger, store)
    }

    fn open_request(user_id: Uuid, balance: rust_decimal::Decimal) -> CreateAccountRequest {
        CreateAccountRequest {
            user_id,
            account_type: AccountType::Savings,
            initial_balance: balance,
        }
    }

    #[test]
    fn test_generated_numbers_are_ten_digits() {
        for _ in 0..1_000 {
            let number = generate_account_number();
            assert_eq!(number.len(), 10);
            assert!(number.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_create_account_persists_active_account() {
        let user = Uuid::new_v4();
        let (ledger, store) = ledger_with(StaticUsers::with([user]));

        let account = ledger
            .create_account(open_request(user, dec!(100)))
            .await
            .unwrap();

        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.balance.to_string(), "100.00");
        assert_eq!(account.created_at, account.last_transaction_at);
        assert_eq!(store.get(account.account_id).await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn test_create_account_unknown_user() {
        let (ledger, _) = ledger_with(StaticUsers::default());

        let result = ledger
            .create_account(open_request(Uuid::new_v4(), dec!(0)))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_account_negative_balance() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));

        let result = ledger.create_account(open_request(user, dec!(-5))).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_user_directory_outage_propagates() {
        let (ledger, _) = ledger_with(StaticUsers::unavailable());

        let result = ledger
            .create_account(open_request(Uuid::new_v4(), dec!(0)))
            .await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_concurrent_creation_never_collides() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    ledger
                        .create_account(open_request(user, dec!(1)))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut numbers = HashSet::new();
        for handle in handles {
            let account = handle.await.unwrap();
            assert_eq!(account.account_number.len(), 10);
            assert!(numbers.insert(account.account_number));
        }
        assert_eq!(ledger.list_by_user(user).await.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_list_by_user_without_accounts_is_not_found() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));

        let result = ledger.list_by_user(user).await;
        assert!(matches!(result, Err(AppError::NotFound(ref m)) if m.contains("No accounts")));
    }

    #[tokio::test]
    async fn test_apply_transfer_conserves_total() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));
        let a = ledger.create_account(open_request(user, dec!(100.00))).await.unwrap();
        let b = ledger.create_account(open_request(user, dec!(50.00))).await.unwrap();

        let (from, to) = ledger
            .apply_transfer(TransferRequest {
                from_account_id: a.account_id,
                to_account_id: b.account_id,
                amount: dec!(30.00),
            })
            .await
            .unwrap();

        assert_eq!(from.balance, dec!(70.00));
        assert_eq!(to.balance, dec!(80.00));
        assert_eq!(from.balance + to.balance, a.balance + b.balance);
        assert!(from.last_transaction_at >= a.last_transaction_at);
    }

    #[tokio::test]
    async fn test_apply_transfer_rejects_same_account() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));
        let a = ledger.create_account(open_request(user, dec!(10))).await.unwrap();

        let result = ledger
            .apply_transfer(TransferRequest {
                from_account_id: a.account_id,
                to_account_id: a.account_id,
                amount: dec!(1),
            })
            .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_concurrent_transfers_never_overdraw() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));
        let a = ledger.create_account(open_request(user, dec!(100.00))).await.unwrap();
        let b = ledger.create_account(open_request(user, dec!(0))).await.unwrap();
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let request = TransferRequest {
                    from_account_id: a.account_id,
                    to_account_id: b.account_id,
                    amount: dec!(10.00),
                };
                tokio::spawn(async move { ledger.apply_transfer(request).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(e) => assert!(matches!(e, AppError::InsufficientFunds(_))),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(ledger.get_account(a.account_id).await.unwrap().balance, dec!(0.00));
        assert_eq!(ledger.get_account(b.account_id).await.unwrap().balance, dec!(100.00));
    }

    #[tokio::test]
    async fn test_create_account_redraws_taken_and_stolen_numbers() {
        let user = Uuid::new_v4();
        let store = Arc::new(CollidingStore {
            taken: 3,
            stolen: 2,
            ..Default::default()
        });
        let ledger = AccountLedger::new(store.clone(), Arc::new(StaticUsers::with([user])));

        let account = ledger
            .create_account(open_request(user, dec!(1)))
            .await
            .unwrap();

        // 3 draws rejected by the existence check, 2 by the insert, the 6th wins
        assert_eq!(store.exists_calls.load(Ordering::SeqCst), 6);
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.get(account.account_id).await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn test_create_account_gives_up_when_every_number_is_taken() {
        let user = Uuid::new_v4();
        let store = Arc::new(CollidingStore {
            taken: 16,
            stolen: usize::MAX,
            ..Default::default()
        });
        let ledger = AccountLedger::new(store.clone(), Arc::new(StaticUsers::with([user])));

        let result = ledger.create_account(open_request(user, dec!(1))).await;

        assert!(matches!(result, Err(AppError::Internal(ref m)) if m.contains("account number")));
        assert_eq!(
            store.exists_calls.load(Ordering::SeqCst),
            MAX_ACCOUNT_NUMBER_ATTEMPTS
        );
        assert_eq!(
            store.insert_calls.load(Ordering::SeqCst),
            MAX_ACCOUNT_NUMBER_ATTEMPTS - 16
        );
        assert!(store.inner.list_by_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_transfer_past_max_balance_changes_nothing() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));
        let a = ledger.create_account(open_request(user, dec!(10.00))).await.unwrap();
        let full = ledger
            .create_account(open_request(user, money::max_balance()))
            .await
            .unwrap();

        let result = ledger
            .apply_transfer(TransferRequest {
                from_account_id: a.account_id,
                to_account_id: full.account_id,
                amount: dec!(0.01),
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert_eq!(ledger.get_account(a.account_id).await.unwrap(), a);
        assert_eq!(ledger.get_account(full.account_id).await.unwrap(), full);
    }

    #[tokio::test]
    async fn test_sweep_racing_a_transfer_loses_no_update() {
        let user = Uuid::new_v4();
        let (ledger, _) = ledger_with(StaticUsers::with([user]));
        let ledger = Arc::new(ledger);

        for _ in 0..50 {
            let a = ledger.create_account(open_request(user, dec!(100.00))).await.unwrap();
            let b = ledger.create_account(open_request(user, dec!(0))).await.unwrap();

            let sweep = {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    ledger
                        .inactivate_stale_accounts(chrono::Duration::zero())
                        .await
                })
            };
            let transfer = {
                let ledger = Arc::clone(&ledger);
                let request = TransferRequest {
                    from_account_id: a.account_id,
                    to_account_id: b.account_id,
                    amount: dec!(30.00),
                };
                tokio::spawn(async move { ledger.apply_transfer(request).await })
            };

            let inactivated = sweep.await.unwrap().unwrap();
            transfer.await.unwrap().unwrap();

            let a_now = ledger.get_account(a.account_id).await.unwrap();
            let b_now = ledger.get_account(b.account_id).await.unwrap();
            assert_eq!(a_now.balance, dec!(70.00));
            assert_eq!(b_now.balance, dec!(30.00));

            // Nothing reactivates an account, so a reported flip must stick
            for account in [&a_now, &b_now] {
                if inactivated.contains(&account.account_id) {
                    assert_eq!(account.status, AccountStatus::Inactive);
                }
            }
        }
    }
}
