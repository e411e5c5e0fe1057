//! Transaction editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
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
    endpoints::{self, format_endpoint},
    flash::{Flash, set_flash},
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    timezone::get_local_timezone,
    transaction::{
        TransactionId, TransactionPatch, get_transaction, update_transaction,
        form::{
            TransactionFormAction, TransactionFormData, TransactionFormErrors, load_accounts,
            transaction_form_view,
        },
    },
};

/// The state needed for editing a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Render the edit page for the transaction with `transaction_id`.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    auth: AuthContext,
) -> Result<Response, Error> {
    let local_timezone = get_local_timezone(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let transaction = {
        let mut connection = lock_connection(&state.db_connection)?;
        with_unit_of_work(&mut connection, |uow| {
            get_transaction(&auth, transaction_id, uow)
        })?
    };
    let accounts = load_accounts(&state.db_connection, &auth)?;
    let form = TransactionFormData::from_transaction(&transaction, local_timezone);

    Ok(edit_transaction_view(transaction_id, &form, &accounts).into_response())
}

fn form_with_errors(
    transaction_id: TransactionId,
    form: &TransactionFormData,
    accounts: &[Account],
    errors: &TransactionFormErrors,
) -> Response {
    let endpoint = format_endpoint(endpoints::TRANSACTION, transaction_id);

    transaction_form_view(
        TransactionFormAction::Update(&endpoint),
        form,
        accounts,
        errors,
    )
    .into_response()
}

/// Handle the transaction edit form.
///
/// The form sends every field, so the whole transaction is validated before
/// it is applied as a patch.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    auth: AuthContext,
    jar: PrivateCookieJar,
    Form(form): Form<TransactionFormData>,
) -> Response {
    let Some(local_timezone) = get_local_timezone(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let re_render = |errors: &TransactionFormErrors| match load_accounts(
        &state.db_connection,
        &auth,
    ) {
        Ok(accounts) => form_with_errors(transaction_id, &form, &accounts, errors),
        Err(error) => error.into_alert_response(),
    };

    let new_transaction = match form.validate(local_timezone) {
        Ok(new_transaction) => new_transaction,
        Err(errors) => return re_render(&errors),
    };
    let (debit_account_id, credit_account_id) = (
        new_transaction.debit_account_id,
        new_transaction.credit_account_id,
    );
    let patch = TransactionPatch {
        date: Some(new_transaction.date),
        amount: Some(new_transaction.amount),
        description: Some(new_transaction.description),
        debit_account_id: Some(debit_account_id),
        credit_account_id: Some(credit_account_id),
    };

    let result = lock_connection(&state.db_connection).and_then(|mut connection| {
        with_unit_of_work(&mut connection, |uow| {
            update_transaction(&auth, transaction_id, patch, uow)
        })
    });

    match result {
        Ok(transaction) => {
            tracing::info!("updated transaction {}", transaction.id);
            let jar = set_flash(jar, &Flash::success("Transaction updated successfully."));

            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                jar,
            )
                .into_response()
        }
        Err(error) => {
            match TransactionFormErrors::from_error(error, debit_account_id, credit_account_id) {
                Ok(errors) => re_render(&errors),
                Err(error) => error.into_alert_response(),
            }
        }
    }
}

fn edit_transaction_view(
    transaction_id: TransactionId,
    form: &TransactionFormData,
    accounts: &[Account],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let endpoint = format_endpoint(endpoints::TRANSACTION, transaction_id);
    let form = transaction_form_view(
        TransactionFormAction::Update(&endpoint),
        form,
        accounts,
        &TransactionFormErrors::default(),
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { "Edit Transaction" }

            (form)
        }
    };

    base("Edit Transaction", &content)
}
