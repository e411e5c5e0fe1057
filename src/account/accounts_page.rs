//! The page listing every account.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, get_all_accounts},
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    endpoints::{self, format_endpoint},
    flash::{Flash, take_flash},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, link,
    },
    navigation::NavBar,
};

/// The state needed for the accounts page.
#[derive(Debug, Clone)]
pub struct AccountsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the table of accounts.
pub async fn get_accounts_page(
    State(state): State<AccountsPageState>,
    auth: AuthContext,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let accounts = {
        let mut connection = lock_connection(&state.db_connection)?;
        with_unit_of_work(&mut connection, |uow| get_all_accounts(&auth, uow))?
    };
    let (jar, flash) = take_flash(jar);

    Ok((jar, accounts_view(&accounts, flash)).into_response())
}

fn account_row(account: &Account) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, account.id);
    let delete_url = format_endpoint(endpoints::ACCOUNT, account.id);
    let confirm_message = format!(
        "Are you sure you want to delete the account \"{}\"? This cannot be undone.",
        account.name
    );

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            th scope="row" class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                (account.name)
            }
            td class=(TABLE_CELL_STYLE) { (account.account_type.as_str()) }
            td class=(TABLE_CELL_STYLE)
            {
                (edit_delete_action_links(&edit_url, &delete_url, &confirm_message))
            }
        }
    }
}

fn accounts_view(accounts: &[Account], flash: Option<Flash>) -> Markup {
    let nav_bar = NavBar::new(endpoints::ACCOUNTS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        @if let Some(flash) = flash {
            (flash.into_html())
        }

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="relative w-full max-w-3xl overflow-x-auto shadow-md sm:rounded-lg"
            {
                div class="flex justify-between flex-wrap items-end px-6 py-4"
                {
                    h1 class="text-xl font-bold" { "Accounts" }

                    a href=(endpoints::NEW_ACCOUNT_VIEW) class=(LINK_STYLE) { "New Account" }
                }

                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for account in accounts {
                            (account_row(account))
                        }

                        @if accounts.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td colspan="3" class="px-6 py-4 text-center"
                                {
                                    "No accounts yet. "
                                    (link(endpoints::NEW_ACCOUNT_VIEW, "Create your first account."))
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Accounts", &content)
}
