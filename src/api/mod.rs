//! The JSON REST API under `/api`.
//!
//! Handlers return [ApiError] so that every failure is rendered as
//! `{"error": code, "message": text}` with a matching status code.

mod accounts;
mod auth;
mod transactions;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{
        FromRef,
        rejection::{JsonRejection, PathRejection},
    },
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Transaction};
use time::Duration;

use crate::{
    AppState, Error,
    db::{lock_connection, with_unit_of_work},
};

pub use accounts::{
    create_account_api, delete_account_api, get_account_api, get_accounts_api, update_account_api,
};
pub use auth::{get_current_user_api, post_log_in_api, post_log_out_api};
pub use transactions::{
    create_transaction_api, delete_transaction_api, get_transaction_api, get_transactions_api,
    update_transaction_api,
};

/// An [Error] rendered as a JSON response.
#[derive(Debug, PartialEq)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::MalformedRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(Error::MalformedRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.into_json_response()
    }
}

/// The state needed by the API handlers.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for ApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

/// Lock the connection and run `operation` in a unit of work.
fn run<T>(
    db_connection: &Mutex<Connection>,
    operation: impl FnOnce(&Transaction) -> Result<T, Error>,
) -> Result<T, ApiError> {
    let mut connection = lock_connection(db_connection)?;

    Ok(with_unit_of_work(&mut connection, operation)?)
}
