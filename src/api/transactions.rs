use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use time_tz::{Tz, timezones};

use crate::{
    api::{ApiError, ApiState, run},
    auth::AuthContext,
    transaction::{
        NewTransaction, Transaction, TransactionFields, TransactionId, TransactionPatch,
        create_transaction, delete_transaction, get_all_transactions, get_transaction,
        update_transaction,
    },
};

/// Dates without an offset sent to the API are read as UTC.
const API_TIMEZONE: &Tz = timezones::db::UTC;

/// `GET /api/transactions/`: every transaction in the order it was recorded.
pub async fn get_transactions_api(
    State(state): State<ApiState>,
    auth: AuthContext,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let transactions = run(&state.db_connection, |uow| get_all_transactions(&auth, uow))?;

    Ok(Json(transactions))
}

/// `POST /api/transactions/` with
/// `{date, amount, description, debit_account_id, credit_account_id}`.
pub async fn create_transaction_api(
    State(state): State<ApiState>,
    auth: AuthContext,
    body: Result<Json<TransactionFields>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    auth.user()?;
    let Json(fields) = body?;
    let new_transaction = NewTransaction::from_fields(&fields, API_TIMEZONE)?;

    let transaction = run(&state.db_connection, |uow| {
        create_transaction(&auth, new_transaction, uow)
    })?;
    tracing::info!("created transaction {}", transaction.id);

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// `GET /api/transactions/{transaction_id}`.
pub async fn get_transaction_api(
    path: Result<Path<TransactionId>, PathRejection>,
    State(state): State<ApiState>,
    auth: AuthContext,
) -> Result<Json<Transaction>, ApiError> {
    auth.user()?;
    let Path(transaction_id) = path?;

    let transaction = run(&state.db_connection, |uow| {
        get_transaction(&auth, transaction_id, uow)
    })?;

    Ok(Json(transaction))
}

/// `PUT /api/transactions/{transaction_id}` with any subset of the fields.
pub async fn update_transaction_api(
    path: Result<Path<TransactionId>, PathRejection>,
    State(state): State<ApiState>,
    auth: AuthContext,
    body: Result<Json<TransactionFields>, JsonRejection>,
) -> Result<Json<Transaction>, ApiError> {
    auth.user()?;
    let Path(transaction_id) = path?;
    let Json(fields) = body?;
    let patch = TransactionPatch::from_fields(&fields, API_TIMEZONE)?;

    let transaction = run(&state.db_connection, |uow| {
        update_transaction(&auth, transaction_id, patch, uow)
    })?;

    Ok(Json(transaction))
}

/// `DELETE /api/transactions/{transaction_id}`.
pub async fn delete_transaction_api(
    path: Result<Path<TransactionId>, PathRejection>,
    State(state): State<ApiState>,
    auth: AuthContext,
) -> Result<StatusCode, ApiError> {
    auth.user()?;
    let Path(transaction_id) = path?;

    run(&state.db_connection, |uow| {
        delete_transaction(&auth, transaction_id, uow)
    })?;
    tracing::info!("deleted transaction {transaction_id}");

    Ok(StatusCode::NO_CONTENT)
}
