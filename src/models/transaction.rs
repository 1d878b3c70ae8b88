//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: transfer record, owned and mutated only by the transactions service
//! - `TransactionStatus`: the INITIATED → {SUCCESS, FAILED} state machine
//! - Request types for the initiate and execute steps
//! - `TransactionResponse`: response body returned to clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::account::ParseEnumError;

/// Transfer lifecycle.
///
/// ```text
/// INITIATED --(execute ok)-----> SUCCESS
/// INITIATED --(execute failed)-> FAILED
/// ```
///
/// `Success` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Initiated,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Initiated => "INITIATED",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Initiated)
    }

    /// Whether the state machine permits `self -> next`.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (
                TransactionStatus::Initiated,
                TransactionStatus::Success | TransactionStatus::Failed
            )
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "INITIATED" => Ok(TransactionStatus::Initiated),
            "SUCCESS" => Ok(TransactionStatus::Success),
            "FAILED" => Ok(TransactionStatus::Failed),
            _ => Err(ParseEnumError {
                kind: "transaction status",
                value,
            }),
        }
    }
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table of the transactions service. The
/// account ids refer to rows owned by the accounts service; they are
/// never joined against, only passed back over HTTP.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Transaction {
    pub transaction_id: Uuid,

    pub from_account_id: Uuid,

    pub to_account_id: Uuid,

    /// Amount to move, scale 2, always > 0
    pub amount: Decimal,

    pub description: Option<String>,

    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,

    /// When the transfer was initiated
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transfer record in `Initiated` state.
    pub fn initiate(
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount: Decimal,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            from_account_id,
            to_account_id,
            amount,
            description,
            status: TransactionStatus::Initiated,
            created_at: now,
        }
    }

    pub fn involves(&self, account_id: Uuid) -> bool {
        self.from_account_id == account_id || self.to_account_id == account_id
    }
}

/// Request to open a transfer.
///
/// # JSON Example
///
/// ```json
/// {
///   "fromAccountId": "550e8400-e29b-41d4-a716-446655440000",
///   "toAccountId": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "30.00",
///   "description": "Rent share"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateTransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to execute a previously initiated transfer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteTransferRequest {
    pub transaction_id: Uuid,
}

/// Response returned for transaction operations and history entries.
///
/// # JSON Example
///
/// ```json
/// {
///   "transactionId": "770e8400-e29b-41d4-a716-446655440002",
///   "fromAccountId": "550e8400-e29b-41d4-a716-446655440000",
///   "toAccountId": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "30.00",
///   "description": "Rent share",
///   "timestamp": "2025-12-21T16:00:00Z",
///   "status": "SUCCESS"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            transaction_id: transaction.transaction_id,
            from_account_id: transaction.from_account_id,
            to_account_id: transaction.to_account_id,
            amount: transaction.amount,
            description: transaction.description,
            timestamp: transaction.created_at,
            status: transaction.status,
        }
    }
}
