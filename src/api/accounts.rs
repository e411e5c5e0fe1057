use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

use crate::{
    account::{
        Account, AccountFields, AccountId, AccountPatch, NewAccount, create_account,
        delete_account, get_account, get_all_accounts, update_account,
    },
    api::{ApiError, ApiState, run},
    auth::AuthContext,
};

/// `GET /api/accounts/`: every account in creation order.
pub async fn get_accounts_api(
    State(state): State<ApiState>,
    auth: AuthContext,
) -> Result<Json<Vec<Account>>, ApiError> {
    let accounts = run(&state.db_connection, |uow| get_all_accounts(&auth, uow))?;

    Ok(Json(accounts))
}

/// `POST /api/accounts/` with `{name, type}`.
pub async fn create_account_api(
    State(state): State<ApiState>,
    auth: AuthContext,
    body: Result<Json<AccountFields>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    auth.user()?;
    let Json(fields) = body?;
    let new_account = NewAccount::from_fields(&fields)?;

    let account = run(&state.db_connection, |uow| {
        create_account(&auth, new_account, uow)
    })?;
    tracing::info!("created account {} ({})", account.id, account.name);

    Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /api/accounts/{account_id}`.
pub async fn get_account_api(
    path: Result<Path<AccountId>, PathRejection>,
    State(state): State<ApiState>,
    auth: AuthContext,
) -> Result<Json<Account>, ApiError> {
    auth.user()?;
    let Path(account_id) = path?;

    let account = run(&state.db_connection, |uow| {
        get_account(&auth, account_id, uow)
    })?;

    Ok(Json(account))
}

/// `PUT /api/accounts/{account_id}` with any of `{name, type}`.
pub async fn update_account_api(
    path: Result<Path<AccountId>, PathRejection>,
    State(state): State<ApiState>,
    auth: AuthContext,
    body: Result<Json<AccountFields>, JsonRejection>,
) -> Result<Json<Account>, ApiError> {
    auth.user()?;
    let Path(account_id) = path?;
    let Json(fields) = body?;
    let patch = AccountPatch::from_fields(&fields)?;

    let account = run(&state.db_connection, |uow| {
        update_account(&auth, account_id, patch, uow)
    })?;

    Ok(Json(account))
}

/// `DELETE /api/accounts/{account_id}`.
pub async fn delete_account_api(
    path: Result<Path<AccountId>, PathRejection>,
    State(state): State<ApiState>,
    auth: AuthContext,
) -> Result<StatusCode, ApiError> {
    auth.user()?;
    let Path(account_id) = path?;

    run(&state.db_connection, |uow| {
        delete_account(&auth, account_id, uow)
    })?;
    tracing::info!("deleted account {account_id}");

    Ok(StatusCode::NO_CONTENT)
}
