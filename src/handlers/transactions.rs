//! Transaction HTTP handlers.
//!
//! This module implements the TransferCoordinator endpoints:
//! - POST /transactions/transfer/initiation - Record a transfer as INITIATED
//! - POST /transactions/transfer/execution - Settle an INITIATED transfer
//! - GET /transactions/accounts/{id} - Transfer history of an account

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, BadRequest},
    models::transaction::{ExecuteTransferRequest, InitiateTransferRequest, TransactionResponse},
    services::transfer_coordinator::TransferCoordinator,
};

/// Initiate a transfer.
///
/// # Endpoint
///
/// `POST /transactions/transfer/initiation`
///
/// # Request Body
///
/// ```json
/// {
///   "fromAccountId": "550e8400-e29b-41d4-a716-446655440000",
///   "toAccountId": "660e8400-e29b-41d4-a716-446655440001",
///   "amount": "30.00",
///   "description": "Rent share"
/// }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the transaction with `"status": "INITIATED"`
/// - **Error (400)**: invalid amount, same account, or unknown account
///
/// No balance changes until the execution call.
pub async fn initiate_transfer(
    State(coordinator): State<Arc<TransferCoordinator>>,
    payload: Result<Json<InitiateTransferRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, BadRequest> {
    let Json(request) = payload.map_err(AppError::from)?;

    let transaction = coordinator.initiate(request).await?;

    Ok(Json(transaction.into()))
}

/// Execute an initiated transfer.
///
/// # Endpoint
///
/// `POST /transactions/transfer/execution`
///
/// # Request Body
///
/// ```json
/// { "transactionId": "770e8400-e29b-41d4-a716-446655440002" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: the transaction with `"status": "SUCCESS"`
/// - **Error (400)**: unknown transaction, already executed, or insufficient funds
///
/// A failed settlement still leaves the transaction durably `FAILED`.
pub async fn execute_transfer(
    State(coordinator): State<Arc<TransferCoordinator>>,
    payload: Result<Json<ExecuteTransferRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, BadRequest> {
    let Json(request) = payload.map_err(AppError::from)?;

    let transaction = coordinator.execute(request.transaction_id).await?;

    Ok(Json(transaction.into()))
}

/// Transfers where the account is source or destination, newest first.
pub async fn account_history(
    State(coordinator): State<Arc<TransferCoordinator>>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = coordinator.history(account_id).await?;
    Ok(Json(
        transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
    ))
}
