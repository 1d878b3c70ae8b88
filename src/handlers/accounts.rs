//! Account management HTTP handlers.
//!
//! This module implements the AccountLedger endpoints:
//! - POST /accounts - Open a new account
//! - GET /accounts/{id} - Get account by ID
//! - GET /accounts/users/{userId}/accounts - List a user's accounts
//! - PUT /accounts/transfer - Apply a debit/credit pair (called by the coordinator)

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, BadRequest},
    models::account::{
        AccountResponse, CreateAccountRequest, TransferConfirmation, TransferRequest,
    },
    services::account_ledger::AccountLedger,
};

/// Open a new account.
///
/// # Endpoint
///
/// `POST /accounts`
///
/// # Request Body
///
/// ```json
/// {
///   "userId": "660e8400-e29b-41d4-a716-446655440001",
///   "accountType": "SAVINGS",
///   "initialBalance": "100.00"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the account summary with
///   `"message": "Account created successfully."`
/// - **Error (400)**: invalid body, negative balance, or unknown user
/// - **Error (502)**: user-identity service unavailable
pub async fn create_account(
    State(ledger): State<Arc<AccountLedger>>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), BadRequest> {
    let Json(request) = payload.map_err(AppError::from)?;

    let account = ledger.create_account(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::from(account).with_message("Account created successfully.")),
    ))
}

/// Get an account by ID.
///
/// # Endpoint
///
/// `GET /accounts/{id}`
///
/// # Response
///
/// - **Success (200 OK)**: the account summary
/// - **Error (404)**: no such account
pub async fn get_account(
    State(ledger): State<Arc<AccountLedger>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = ledger.get_account(account_id).await?;
    Ok(Json(account.into()))
}

/// List every account of a user, oldest first.
///
/// `404` when the user is unknown or has no accounts.
pub async fn list_user_accounts(
    State(ledger): State<Arc<AccountLedger>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = ledger.list_by_user(user_id).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// Apply a transfer to both balances.
///
/// # Endpoint
///
/// `PUT /accounts/transfer`
///
/// # Request Body
///
/// ```json
/// {
///   "fromAccountId": "550e8400-e29b-41d4-a716-446655440000",
///   "toAccountId": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "30.00"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{"message": "Account balances updated successfully"}`
/// - **Error (400)**: invalid amount, same account, missing account, insufficient funds
pub async fn apply_transfer(
    State(ledger): State<Arc<AccountLedger>>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferConfirmation>, BadRequest> {
    let Json(request) = payload.map_err(AppError::from)?;

    ledger.apply_transfer(request).await?;

    Ok(Json(TransferConfirmation::applied()))
}
