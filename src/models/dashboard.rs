//! Dashboard view assembled by the gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    account::{AccountResponse, AccountStatus, AccountType},
    transaction::TransactionResponse,
};

/// User profile as served by the user-identity service
/// (`GET /users/{id}/profile`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// One account on the dashboard with its recent transfers.
///
/// `transactions` is empty both when the account has no history and
/// when the history lookup failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAccount {
    pub account_id: Uuid,
    pub account_number: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub transactions: Vec<TransactionResponse>,
}

impl DashboardAccount {
    pub fn new(account: AccountResponse, transactions: Vec<TransactionResponse>) -> Self {
        Self {
            account_id: account.account_id,
            account_number: account.account_number,
            account_type: account.account_type,
            balance: account.balance,
            status: account.status,
            transactions,
        }
    }
}

/// Response of `GET /bff/dashboard/{userId}`.
///
/// # JSON Example
///
/// ```json
/// {
///   "userId": "660e8400-e29b-41d4-a716-446655440001",
///   "username": "ada",
///   "email": "ada@example.com",
///   "firstName": "Ada",
///   "lastName": "Lovelace",
///   "accounts": [
///     {
///       "accountId": "550e8400-e29b-41d4-a716-446655440000",
///       "accountNumber": "0042137730",
///       "accountType": "SAVINGS",
///       "balance": "70.00",
///       "status": "ACTIVE",
///       "transactions": []
///     }
///   ]
/// }
/// ```
///
/// `accounts` is omitted when the user has no accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<DashboardAccount>>,
}

impl DashboardResponse {
    pub fn profile_only(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            accounts: None,
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<DashboardAccount>) -> Self {
        if !accounts.is_empty() {
            self.accounts = Some(accounts);
        }
        self
    }
}
