//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: ledger entity, owned and mutated only by the accounts service
//! - `CreateAccountRequest`: request body for opening accounts
//! - `AccountResponse`: account summary returned to clients and peer services
//! - `TransferRequest` / `TransferConfirmation`: the `ApplyTransfer` contract

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::money};

/// Raised when a stored enum column holds an unknown value.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Closed set of account products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Checking => "CHECKING",
            AccountType::Business => "BUSINESS",
        }
    }
}

impl TryFrom<String> for AccountType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "SAVINGS" => Ok(AccountType::Savings),
            "CHECKING" => Ok(AccountType::Checking),
            "BUSINESS" => Ok(AccountType::Business),
            _ => Err(ParseEnumError {
                kind: "account type",
                value,
            }),
        }
    }
}

/// Account lifecycle status.
///
/// Only the inactivation sweep moves an account from `Active` to
/// `Inactive`; nothing moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
        }
    }
}

impl TryFrom<String> for AccountStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ACTIVE" => Ok(AccountStatus::Active),
            "INACTIVE" => Ok(AccountStatus::Inactive),
            _ => Err(ParseEnumError {
                kind: "account status",
                value,
            }),
        }
    }
}

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table of the accounts service. Each account:
/// - Belongs to one user (via `user_id`, owned by the user-identity service)
/// - Has a globally unique 10-digit `account_number`
/// - Holds a `NUMERIC(19, 2)` balance that never goes negative
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    pub account_id: Uuid,

    pub user_id: Uuid,

    /// 10 decimal digits, zero-padded
    pub account_number: String,

    #[sqlx(try_from = "String")]
    pub account_type: AccountType,

    /// Current balance, scale 2
    ///
    /// Must be >= 0 (enforced by `debit` and a CHECK constraint).
    pub balance: Decimal,

    #[sqlx(try_from = "String")]
    pub status: AccountStatus,

    pub created_at: DateTime<Utc>,

    /// Time of the last balance-affecting transaction
    ///
    /// Drives the inactivation sweep.
    pub last_transaction_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account.
    ///
    /// New accounts start `Active` with `created_at == last_transaction_at == now`.
    pub fn open(
        user_id: Uuid,
        account_number: String,
        account_type: AccountType,
        balance: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            user_id,
            account_number,
            account_type,
            balance,
            status: AccountStatus::Active,
            created_at: now,
            last_transaction_at: now,
        }
    }

    /// Remove `amount` from the balance.
    ///
    /// # Errors
    ///
    /// - `InsufficientFunds`: `amount` exceeds the current balance; the
    ///   account is left untouched
    pub fn debit(&mut self, amount: Decimal, at: DateTime<Utc>) -> Result<(), AppError> {
        if amount > self.balance {
            return Err(AppError::InsufficientFunds(format!(
                "Insufficient funds. Account balance: {}, Transfer amount: {}",
                self.balance, amount
            )));
        }
        self.balance -= amount;
        self.last_transaction_at = at;
        Ok(())
    }

    /// Add `amount` to the balance.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: the new balance would exceed [`money::max_balance`];
    ///   the account is left untouched
    pub fn credit(&mut self, amount: Decimal, at: DateTime<Utc>) -> Result<(), AppError> {
        let balance = self
            .balance
            .checked_add(amount)
            .filter(|balance| *balance <= money::max_balance())
            .ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "Crediting {amount} would exceed the maximum balance of {}",
                    money::max_balance()
                ))
            })?;
        self.balance = balance;
        self.last_transaction_at = at;
        Ok(())
    }
}

/// Request body for opening a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "userId": "550e8400-e29b-41d4-a716-446655440000",
///   "accountType": "SAVINGS",
///   "initialBalance": "100.00"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub user_id: Uuid,

    pub account_type: AccountType,

    /// Opening balance (defaults to 0 if not provided)
    #[serde(default)]
    pub initial_balance: Decimal,
}

/// Account summary returned by every account endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "accountId": "550e8400-e29b-41d4-a716-446655440000",
///   "userId": "660e8400-e29b-41d4-a716-446655440001",
///   "accountNumber": "0042137730",
///   "accountType": "SAVINGS",
///   "balance": "100.00",
///   "status": "ACTIVE",
///   "createdAt": "2025-12-20T10:00:00Z",
///   "lastTransactionAt": "2025-12-20T10:00:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub last_transaction_at: DateTime<Utc>,

    /// Set only on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            user_id: account.user_id,
            account_number: account.account_number,
            account_type: account.account_type,
            balance: account.balance,
            status: account.status,
            created_at: account.created_at,
            last_transaction_at: account.last_transaction_at,
            message: None,
        }
    }
}

impl AccountResponse {
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

/// Body of `PUT /accounts/transfer`, the ledger's debit/credit contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfirmation {
    pub message: String,
}

impl TransferConfirmation {
    pub fn applied() -> Self {
        Self {
            message: "Account balances updated successfully".to_string(),
        }
    }
}
