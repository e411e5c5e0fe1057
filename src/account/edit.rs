//! Account editing page and endpoint.

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
    account::{
        AccountFields, AccountId, AccountPatch, NewAccount, get_account, update_account,
        form::{AccountFormAction, AccountFormErrors, account_form_view},
    },
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    endpoints::{self, format_endpoint},
    flash::{Flash, set_flash},
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
};

/// The state needed for editing an account.
#[derive(Debug, Clone)]
pub struct EditAccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the edit page for the account with `account_id`, prefilled with its
/// current values.
pub async fn get_edit_account_page(
    Path(account_id): Path<AccountId>,
    State(state): State<EditAccountState>,
    auth: AuthContext,
) -> Result<Response, Error> {
    let account = {
        let mut connection = lock_connection(&state.db_connection)?;
        with_unit_of_work(&mut connection, |uow| get_account(&auth, account_id, uow))?
    };

    let fields = AccountFields {
        name: Some(account.name),
        account_type: Some(account.account_type.as_str().to_owned()),
    };

    Ok(edit_account_view(account_id, &fields).into_response())
}

/// Handle the account edit form.
///
/// The form always sends both fields, so they are validated as a whole before
/// being applied as a patch.
pub async fn update_account_endpoint(
    Path(account_id): Path<AccountId>,
    State(state): State<EditAccountState>,
    auth: AuthContext,
    jar: PrivateCookieJar,
    Form(fields): Form<AccountFields>,
) -> Response {
    let result = NewAccount::from_fields(&fields).and_then(|account| {
        let patch = AccountPatch {
            name: Some(account.name),
            account_type: Some(account.account_type),
        };
        let mut connection = lock_connection(&state.db_connection)?;
        with_unit_of_work(&mut connection, |uow| {
            update_account(&auth, account_id, patch, uow)
        })
    });

    match result {
        Ok(account) => {
            tracing::info!("updated account {} ({})", account.id, account.name);
            let jar = set_flash(jar, &Flash::success("Account updated successfully."));

            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::ACCOUNTS_VIEW.to_owned()),
                jar,
            )
                .into_response()
        }
        Err(error) => match AccountFormErrors::from_error(error) {
            Ok(errors) => {
                let endpoint = format_endpoint(endpoints::ACCOUNT, account_id);
                account_form_view(AccountFormAction::Update(&endpoint), &fields, &errors)
                    .into_response()
            }
            Err(error) => error.into_alert_response(),
        },
    }
}

fn edit_account_view(account_id: AccountId, fields: &AccountFields) -> Markup {
    let nav_bar = NavBar::new(endpoints::ACCOUNTS_VIEW).into_html();
    let endpoint = format_endpoint(endpoints::ACCOUNT, account_id);
    let form = account_form_view(
        AccountFormAction::Update(&endpoint),
        fields,
        &AccountFormErrors::default(),
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { "Edit Account" }

            (form)
        }
    };

    base("Edit Account", &content)
}
