//! Account creation page and endpoint.

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
    AppState,
    account::{
        AccountFields, NewAccount, create_account,
        form::{AccountFormAction, AccountFormErrors, account_form_view},
    },
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    endpoints,
    flash::{Flash, set_flash},
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
};

/// The state needed for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the account creation page.
pub async fn get_new_account_page() -> Response {
    new_account_view().into_response()
}

/// Handle the account creation form.
///
/// Validation errors re-render the form with the message next to the field.
/// On success the client is redirected to the accounts page.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    auth: AuthContext,
    jar: PrivateCookieJar,
    Form(fields): Form<AccountFields>,
) -> Response {
    let result = NewAccount::from_fields(&fields).and_then(|new_account| {
        let mut connection = lock_connection(&state.db_connection)?;
        with_unit_of_work(&mut connection, |uow| create_account(&auth, new_account, uow))
    });

    match result {
        Ok(account) => {
            tracing::info!("created account {} ({})", account.id, account.name);
            let jar = set_flash(jar, &Flash::success("Account created successfully."));

            (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::ACCOUNTS_VIEW.to_owned()),
                jar,
            )
                .into_response()
        }
        Err(error) => match AccountFormErrors::from_error(error) {
            Ok(errors) => account_form_view(
                AccountFormAction::Create(endpoints::NEW_ACCOUNT_VIEW),
                &fields,
                &errors,
            )
            .into_response(),
            Err(error) => error.into_alert_response(),
        },
    }
}

fn new_account_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_ACCOUNT_VIEW).into_html();
    let form = account_form_view(
        AccountFormAction::Create(endpoints::NEW_ACCOUNT_VIEW),
        &AccountFields::default(),
        &AccountFormErrors::default(),
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="mb-4 text-xl font-bold" { "New Account" }

            (form)
        }
    };

    base("Create Account", &content)
}

#[cfg(test)]
mod new_account_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_select, assert_form_submit_button, assert_hx_endpoint,
            assert_valid_html, get_header, must_get_form, parse_html_document,
        },
    };

    use super::get_new_account_page;

    #[tokio::test]
    async fn render_page() {
        let response = get_new_account_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            get_header(&response, "content-type"),
            "text/html; charset=utf-8"
        );

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::NEW_ACCOUNT_VIEW, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_select(&form, "type", "");
        assert_form_submit_button(&form);
    }
}

#[cfg(test)]
mod create_account_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};
    use axum_extra::extract::{Form, PrivateCookieJar};

    use crate::{
        account::{Account, AccountFields, AccountType, get_all_accounts},
        app_state::create_cookie_key,
        auth::AuthContext,
        endpoints,
        test_utils::{
            assert_form_error_message, assert_hx_redirect, assert_valid_html, get_test_connection,
            must_get_form, parse_html_fragment, test_auth,
        },
    };

    use super::{CreateAccountState, create_account_endpoint};

    fn get_state() -> CreateAccountState {
        CreateAccountState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
        }
    }

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(create_cookie_key("foobar"))
    }

    fn fields(name: &str, account_type: &str) -> AccountFields {
        AccountFields {
            name: Some(name.to_owned()),
            account_type: Some(account_type.to_owned()),
        }
    }

    #[tokio::test]
    async fn can_create_account() {
        let state = get_state();

        let response = create_account_endpoint(
            State(state.clone()),
            test_auth(),
            get_jar(),
            Form(fields("Cash", "Asset")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::ACCOUNTS_VIEW);
        let accounts = get_all_accounts(&test_auth(), &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(
            accounts,
            [Account {
                id: 1,
                name: "Cash".to_owned(),
                account_type: AccountType::Asset,
            }]
        );
    }

    #[tokio::test]
    async fn sets_success_flash() {
        let response = create_account_endpoint(
            State(get_state()),
            test_auth(),
            get_jar(),
            Form(fields("Cash", "Asset")),
        )
        .await;

        let set_cookie = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("flash="));
        assert!(set_cookie.is_some(), "expected a flash cookie to be set");
    }

    #[tokio::test]
    async fn duplicate_name_shows_field_error() {
        let state = get_state();
        create_account_endpoint(
            State(state.clone()),
            test_auth(),
            get_jar(),
            Form(fields("Cash", "Asset")),
        )
        .await;

        let response = create_account_endpoint(
            State(state),
            test_auth(),
            get_jar(),
            Form(fields("Cash", "Expense")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_error_message(&form, "An account named \"Cash\" already exists");
    }

    #[tokio::test]
    async fn missing_type_shows_field_error() {
        let response = create_account_endpoint(
            State(get_state()),
            test_auth(),
            get_jar(),
            Form(AccountFields {
                name: Some("Cash".to_owned()),
                account_type: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Please select an account type");
    }

    #[tokio::test]
    async fn anonymous_gets_alert() {
        let response = create_account_endpoint(
            State(get_state()),
            AuthContext::Anonymous,
            get_jar(),
            Form(fields("Cash", "Asset")),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
