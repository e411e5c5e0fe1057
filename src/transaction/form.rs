//! The form shared by the create and edit transaction pages.

use std::sync::Mutex;

use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time_tz::Tz;

use crate::{
    Error,
    account::{Account, AccountId, get_all_accounts},
    alert::ALERT_CONTAINER_ID,
    auth::AuthContext,
    db::{lock_connection, with_unit_of_work},
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, submit_button},
    transaction::{
        NewTransaction, Transaction,
        date::{format_datetime_local, parse_timestamp},
    },
};

/// Where the form is submitted to.
pub(super) enum TransactionFormAction<'a> {
    Create(&'a str),
    Update(&'a str),
}

/// The raw form fields. Empty inputs arrive as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFormData {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub description: Option<String>,
    pub debit_account_id: Option<String>,
    pub credit_account_id: Option<String>,
}

/// Messages shown under the fields that failed validation.
#[derive(Debug, Default, PartialEq)]
pub(super) struct TransactionFormErrors {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub description: Option<String>,
    pub debit_account: Option<String>,
    pub credit_account: Option<String>,
}

impl TransactionFormErrors {
    /// Turn an error from the ledger into a message for the field it is about.
    ///
    /// Errors that are not about a single field are handed back.
    pub fn from_error(
        error: Error,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
    ) -> Result<Self, Error> {
        match error {
            Error::InvalidAccount(id) if id == debit_account_id => Ok(Self {
                debit_account: Some("Please select a debit account".to_owned()),
                ..Default::default()
            }),
            Error::InvalidAccount(id) if id == credit_account_id => Ok(Self {
                credit_account: Some("Please select a credit account".to_owned()),
                ..Default::default()
            }),
            Error::SameAccount(_) => Ok(Self {
                credit_account: Some(
                    "The credit account must be different to the debit account".to_owned(),
                ),
                ..Default::default()
            }),
            error => Err(error),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_account_id(raw: Option<&str>) -> Option<AccountId> {
    non_blank(raw).and_then(|raw| raw.parse().ok())
}

impl TransactionFormData {
    /// Prefill the form from a stored transaction, showing its date in
    /// `local_timezone`.
    pub(super) fn from_transaction(transaction: &Transaction, local_timezone: &Tz) -> Self {
        Self {
            date: Some(format_datetime_local(transaction.date, local_timezone)),
            amount: Some(transaction.amount.to_string()),
            description: Some(transaction.description.clone()),
            debit_account_id: Some(transaction.debit_account_id.to_string()),
            credit_account_id: Some(transaction.credit_account_id.to_string()),
        }
    }

    /// Check every field, collecting a message for each one that is wrong.
    ///
    /// Dates are read in `local_timezone`.
    pub(super) fn validate(
        &self,
        local_timezone: &Tz,
    ) -> Result<NewTransaction, TransactionFormErrors> {
        let date = non_blank(self.date.as_deref())
            .and_then(|date| parse_timestamp(date, local_timezone).ok());
        let amount = non_blank(self.amount.as_deref())
            .and_then(|amount| amount.parse::<f64>().ok())
            .filter(|amount| amount.is_finite());
        let description = non_blank(self.description.as_deref());
        let debit_account_id = parse_account_id(self.debit_account_id.as_deref());
        let credit_account_id = parse_account_id(self.credit_account_id.as_deref());

        match (date, amount, description, debit_account_id, credit_account_id) {
            (
                Some(date),
                Some(amount),
                Some(_),
                Some(debit_account_id),
                Some(credit_account_id),
            ) => Ok(NewTransaction {
                date,
                amount,
                description: self.description.clone().unwrap_or_default(),
                debit_account_id,
                credit_account_id,
            }),
            _ => {
                let message = |missing: bool, text: &str| missing.then(|| text.to_owned());

                let errors = TransactionFormErrors {
                    date: message(date.is_none(), "Please enter a valid date"),
                    amount: message(amount.is_none(), "Please enter a valid amount"),
                    description: message(description.is_none(), "Description is required"),
                    debit_account: message(
                        debit_account_id.is_none(),
                        "Please select a debit account",
                    ),
                    credit_account: message(
                        credit_account_id.is_none(),
                        "Please select a credit account",
                    ),
                };

                Err(errors)
            }
        }
    }
}

/// The accounts offered in the debit and credit selects.
pub(super) fn load_accounts(
    db_connection: &Mutex<Connection>,
    auth: &AuthContext,
) -> Result<Vec<Account>, Error> {
    let mut connection = lock_connection(db_connection)?;
    with_unit_of_work(&mut connection, |uow| get_all_accounts(auth, uow))
}

fn field_error(message: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = message {
            p class="mt-2 text-sm text-red-600 dark:text-red-400" { (message) }
        }
    }
}

fn account_select(
    name: &str,
    label: &str,
    accounts: &[Account],
    selected: &str,
    error: Option<&str>,
) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            select id=(name) name=(name) required class=(FORM_TEXT_INPUT_STYLE)
            {
                option value="" disabled selected[selected.is_empty()] { "Select an account" }

                @for account in accounts {
                    @let value = account.id.to_string();
                    option value=(value) selected[selected == value]
                    {
                        (account.name) " (" (account.account_type.as_str()) ")"
                    }
                }
            }

            (field_error(error))
        }
    }
}

pub(super) fn transaction_form_view(
    action: TransactionFormAction<'_>,
    form: &TransactionFormData,
    accounts: &[Account],
    errors: &TransactionFormErrors,
) -> Markup {
    let (hx_post, hx_put, button_label) = match action {
        TransactionFormAction::Create(endpoint) => (Some(endpoint), None, "Create Transaction"),
        TransactionFormAction::Update(endpoint) => (None, Some(endpoint), "Update Transaction"),
    };
    let value = |field: &Option<String>| field.clone().unwrap_or_default();

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-swap="outerHTML"
            hx-target-error={ "#" (ALERT_CONTAINER_ID) }
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="datetime-local"
                    name="date"
                    value=(value(&form.date))
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_error(errors.date.as_deref()))
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    step="0.01"
                    placeholder="0.00"
                    value=(value(&form.amount))
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_error(errors.amount.as_deref()))
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    id="description"
                    type="text"
                    name="description"
                    placeholder="e.g. Groceries"
                    value=(value(&form.description))
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_error(errors.description.as_deref()))
            }

            (account_select(
                "debit_account_id",
                "Debit account",
                accounts,
                form.debit_account_id.as_deref().unwrap_or_default(),
                errors.debit_account.as_deref(),
            ))

            (account_select(
                "credit_account_id",
                "Credit account",
                accounts,
                form.credit_account_id.as_deref().unwrap_or_default(),
                errors.credit_account.as_deref(),
            ))

            (submit_button(button_label))
        }
    }
}
