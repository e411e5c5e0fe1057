//! Transaction deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState,
    alert::Alert,
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    transaction::{TransactionId, delete_transaction},
};

/// The state needed for deleting a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle transaction deletion. Returns success alert or error.
pub async fn delete_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<DeleteTransactionState>,
    auth: AuthContext,
) -> Response {
    let result = lock_connection(&state.db_connection).and_then(|mut connection| {
        with_unit_of_work(&mut connection, |uow| {
            delete_transaction(&auth, transaction_id, uow)
        })
    });

    match result {
        Ok(()) => Alert::SuccessSimple {
            message: "Transaction deleted successfully.".to_owned(),
        }
        .into_response(),
        Err(error) => {
            tracing::warn!("could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}
