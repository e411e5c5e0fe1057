//! The page listing every transaction.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};
use rusqlite::Connection;
use time_tz::Tz;

use crate::{
    AppState, Error,
    account::{AccountId, get_all_accounts},
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    endpoints::{self, format_endpoint},
    flash::{Flash, take_flash},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, format_currency, link,
    },
    navigation::NavBar,
    timezone::get_local_timezone,
    transaction::{Transaction, date::format_local, get_all_transactions},
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A transaction as shown in the table, with account names resolved and
/// the date in local time.
struct TransactionRow {
    id: i64,
    date: String,
    description: String,
    amount: String,
    debit_account: String,
    credit_account: String,
}

impl TransactionRow {
    fn new(
        transaction: Transaction,
        account_names: &HashMap<AccountId, String>,
        local_timezone: &Tz,
    ) -> Self {
        let account_name = |id: AccountId| {
            account_names
                .get(&id)
                .cloned()
                .unwrap_or_else(|| format!("Account {id}"))
        };

        Self {
            id: transaction.id,
            date: format_local(transaction.date, local_timezone),
            description: transaction.description,
            amount: format_currency(transaction.amount),
            debit_account: account_name(transaction.debit_account_id),
            credit_account: account_name(transaction.credit_account_id),
        }
    }
}

/// Render the table of transactions.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    auth: AuthContext,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let local_timezone = get_local_timezone(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let (accounts, transactions) = {
        let mut connection = lock_connection(&state.db_connection)?;
        with_unit_of_work(&mut connection, |uow| {
            Ok((
                get_all_accounts(&auth, uow)?,
                get_all_transactions(&auth, uow)?,
            ))
        })?
    };

    let account_names = accounts
        .into_iter()
        .map(|account| (account.id, account.name))
        .collect::<HashMap<_, _>>();
    let rows = transactions
        .into_iter()
        .map(|transaction| TransactionRow::new(transaction, &account_names, local_timezone))
        .collect::<Vec<_>>();
    let (jar, flash) = take_flash(jar);

    Ok((jar, transactions_view(&rows, flash)).into_response())
}

fn transaction_row_view(row: &TransactionRow) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, row.id);
    let delete_url = format_endpoint(endpoints::TRANSACTION, row.id);
    let confirm_message = format!(
        "Are you sure you want to delete the transaction \"{}\"? This cannot be undone.",
        row.description
    );

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (row.date) }
            td class=(TABLE_CELL_STYLE) { (row.description) }
            td class="px-6 py-4 text-right" { (row.amount) }
            td class=(TABLE_CELL_STYLE) { (row.debit_account) }
            td class=(TABLE_CELL_STYLE) { (row.credit_account) }
            td class=(TABLE_CELL_STYLE)
            {
                (edit_delete_action_links(&edit_url, &delete_url, &confirm_message))
            }
        }
    }
}

fn transactions_view(rows: &[TransactionRow], flash: Option<Flash>) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        @if let Some(flash) = flash {
            (flash.into_html())
        }

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="relative w-full max-w-5xl overflow-x-auto shadow-md sm:rounded-lg"
            {
                div class="flex justify-between flex-wrap items-end px-6 py-4"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE) { "New Transaction" }
                }

                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                            th scope="col" class="px-6 py-3 text-right" { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Debit" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Credit" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for row in rows {
                            (transaction_row_view(row))
                        }

                        @if rows.is_empty() {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td colspan="6" class="px-6 py-4 text-center"
                                {
                                    "No transactions yet. "
                                    (link(endpoints::NEW_TRANSACTION_VIEW, "Record your first transaction."))
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    base("Transactions", &content)
}

#[cfg(test)]
mod transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::PrivateCookieJar;
    use scraper::Selector;
    use time::macros::datetime;

    use crate::{
        account::{AccountType, NewAccount, create_account},
        app_state::create_cookie_key,
        html::format_currency,
        test_utils::{assert_valid_html, get_test_connection, parse_html_document, test_auth},
        transaction::{NewTransaction, create_transaction},
    };

    use super::{TransactionsPageState, get_transactions_page};

    fn get_state(local_timezone: &str) -> TransactionsPageState {
        let connection = get_test_connection();
        for (name, account_type) in [("Cash", AccountType::Asset), ("Food", AccountType::Expense)] {
            create_account(
                &test_auth(),
                NewAccount {
                    name: name.to_owned(),
                    account_type,
                },
                &connection,
            )
            .unwrap();
        }
        create_transaction(
            &test_auth(),
            NewTransaction {
                date: datetime!(2024-06-14 21:30 UTC),
                amount: 1234.5,
                description: "Groceries".to_owned(),
                debit_account_id: 2,
                credit_account_id: 1,
            },
            &connection,
        )
        .unwrap();

        TransactionsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: local_timezone.to_owned(),
        }
    }

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(create_cookie_key("foobar"))
    }

    #[tokio::test]
    async fn shows_account_names_and_formatted_amount() {
        let response = get_transactions_page(State(get_state("Etc/UTC")), test_auth(), get_jar())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let cells = html
            .select(&Selector::parse("tbody tr td").unwrap())
            .take(5)
            .map(|cell| cell.text().collect::<String>())
            .collect::<Vec<_>>();
        assert_eq!(
            cells,
            [
                "2024-06-14 21:30".to_owned(),
                "Groceries".to_owned(),
                format_currency(1234.5),
                "Food".to_owned(),
                "Cash".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn dates_are_shown_in_local_time() {
        // Etc/GMT-12 is a fixed UTC+12 offset.
        let response = get_transactions_page(State(get_state("Etc/GMT-12")), test_auth(), get_jar())
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let date = html
            .select(&Selector::parse("tbody tr td").unwrap())
            .next()
            .map(|cell| cell.text().collect::<String>());
        assert_eq!(date.as_deref(), Some("2024-06-15 09:30"));
    }

    #[tokio::test]
    async fn winter_dates_use_standard_time() {
        // 21:30 UTC in June is 09:30 NZST (+12), not 10:30 NZDT.
        let response =
            get_transactions_page(State(get_state("Pacific/Auckland")), test_auth(), get_jar())
                .await
                .unwrap();

        let html = parse_html_document(response).await;
        let date = html
            .select(&Selector::parse("tbody tr td").unwrap())
            .next()
            .map(|cell| cell.text().collect::<String>());
        assert_eq!(date.as_deref(), Some("2024-06-15 09:30"));
    }

    #[tokio::test]
    async fn unknown_timezone_is_server_error() {
        let response = get_transactions_page(State(get_state("Middle/Earth")), test_auth(), get_jar())
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
