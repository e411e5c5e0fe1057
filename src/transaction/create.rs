//! Transaction creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::Account,
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    endpoints,
    flash::{Flash, set_flash},
    html::{FORM_CONTAINER_STYLE, base, link},
    navigation::NavBar,
    timezone::get_local_timezone,
    transaction::{
        create_transaction,
        form::{
            TransactionFormAction, TransactionFormData, TransactionFormErrors, load_accounts,
            transaction_form_view,
        },
    },
};

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the transaction creation page.
pub async fn get_new_transaction_page(
    State(state): State<CreateTransactionState>,
    auth: AuthContext,
) -> Result<Response, Error> {
    let accounts = load_accounts(&state.db_connection, &auth)?;

    Ok(new_transaction_view(&accounts).into_response())
}

fn form_with_errors(
    form: &TransactionFormData,
    accounts: &[Account],
    errors: &TransactionFormErrors,
) -> Response {
    transaction_form_view(
        TransactionFormAction::Create(endpoints::NEW_TRANSACTION_VIEW),
        form,
        accounts,
        errors,
    )
    .into_response()
}

/// Handle the transaction creation form.
///
/// The date is read in the server's local timezone. Every invalid field is
/// reported on the re-rendered form at once.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    auth: AuthContext,
    jar: PrivateCookieJar,
    Form(form): Form<TransactionFormData>,
) -> Response {
    let Some(local_timezone) = get_local_timezone(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let new_transaction = match form.validate(local_timezone) {
        Ok(new_transaction) => new_transaction,
        Err(errors) => {
            return match load_accounts(&state.db_connection, &auth) {
                Ok(accounts) => form_with_errors(&form, &accounts, &errors),
                Err(error) => error.into_alert_response(),
            };
        }
    };
    let (debit_account_id, credit_account_id) = (
        new_transaction.debit_account_id,
        new_transaction.credit_account_id,
    );

    let result = lock_connection(&state.db_connection).and_then(|mut connection| {
        with_unit_of_work(&mut connection, |uow| {
            create_transaction(&auth, new_transaction, uow)
        })
    });

    match result {
        Ok(transaction) => {
            tracing::info!("created transaction {}", transaction.id);
            let jar = set_flash(jar, &Flash::success("Transaction created successfully."));

            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                jar,
            )
                .into_response()
        }
        Err(error) => {
            match TransactionFormErrors::from_error(error, debit_account_id, credit_account_id) {
                Ok(errors) => match load_accounts(&state.db_connection, &auth) {
                    Ok(accounts) => form_with_errors(&form, &accounts, &errors),
                    Err(error) => error.into_alert_response(),
                },
                Err(error) => error.into_alert_response(),
            }
        }
    }
}

fn new_transaction_view(accounts: &[Account]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();
    let form = transaction_form_view(
        TransactionFormAction::Create(endpoints::NEW_TRANSACTION_VIEW),
        &TransactionFormData::default(),
        accounts,
        &TransactionFormErrors::default(),
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { "New Transaction" }

            @if accounts.len() < 2 {
                p class="mb-4 text-sm text-gray-600 dark:text-gray-400"
                {
                    "A transaction needs two accounts. "
                    (link(endpoints::NEW_ACCOUNT_VIEW, "Create an account"))
                    " first."
                }
            }

            (form)
        }
    };

    base("Create Transaction", &content)
}
