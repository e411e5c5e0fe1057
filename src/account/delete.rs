//! Account deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState,
    account::{AccountId, delete_account},
    alert::Alert,
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
};

/// The state needed for deleting an account.
#[derive(Debug, Clone)]
pub struct DeleteAccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle account deletion. Returns a success alert, or an error alert if the
/// account does not exist or still has transactions.
pub async fn delete_account_endpoint(
    Path(account_id): Path<AccountId>,
    State(state): State<DeleteAccountState>,
    auth: AuthContext,
) -> Response {
    let result = lock_connection(&state.db_connection).and_then(|mut connection| {
        with_unit_of_work(&mut connection, |uow| {
            delete_account(&auth, account_id, uow)
        })
    });

    match result {
        Ok(()) => {
            tracing::info!("deleted account {account_id}");
            Alert::SuccessSimple {
                message: "Account deleted successfully.".to_owned(),
            }
            .into_response()
        }
        Err(error) => {
            tracing::warn!("could not delete account {account_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_account_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use scraper::Html;
    use time::macros::datetime;

    use crate::{
        account::{AccountType, NewAccount, create_account, get_all_accounts},
        test_utils::{assert_valid_html, get_header, get_test_connection, parse_html_fragment, test_auth},
        transaction::{NewTransaction, create_transaction},
    };

    use super::{DeleteAccountState, delete_account_endpoint};

    fn create_accounts(connection: &Connection) {
        for (name, account_type) in [("Cash", AccountType::Asset), ("Food", AccountType::Expense)] {
            create_account(
                &test_auth(),
                NewAccount {
                    name: name.to_owned(),
                    account_type,
                },
                connection,
            )
            .unwrap();
        }
    }

    fn get_state(connection: Connection) -> DeleteAccountState {
        DeleteAccountState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[track_caller]
    fn assert_alert_text(html: &Html, want: &str) {
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(want), "want alert containing {want:?}, got {text:?}");
    }

    #[tokio::test]
    async fn deletes_unused_account() {
        let connection = get_test_connection();
        create_accounts(&connection);
        let state = get_state(connection);

        let response = delete_account_endpoint(Path(1), State(state.clone()), test_auth()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert_alert_text(&html, "Account deleted successfully.");
        let remaining = get_all_accounts(&test_auth(), &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Food");
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let state = get_state(get_test_connection());

        let response = delete_account_endpoint(Path(99), State(state), test_auth()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get_header(&response, "content-type"),
            "text/html; charset=utf-8"
        );
        let html = parse_html_fragment(response).await;
        assert_alert_text(&html, "Not found");
    }

    #[tokio::test]
    async fn account_with_transactions_is_kept() {
        let connection = get_test_connection();
        create_accounts(&connection);
        create_transaction(
            &test_auth(),
            NewTransaction {
                date: datetime!(2026-03-01 12:00 UTC),
                amount: 12.5,
                description: "Lunch".to_owned(),
                debit_account_id: 2,
                credit_account_id: 1,
            },
            &connection,
        )
        .unwrap();
        let state = get_state(connection);

        let response = delete_account_endpoint(Path(1), State(state.clone()), test_auth()).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let html = parse_html_fragment(response).await;
        assert_alert_text(&html, "Could not delete account");
        let remaining = get_all_accounts(&test_auth(), &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
