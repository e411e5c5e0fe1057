//! The transaction ledger: double-entry records that move an amount from one
//! account to another.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time_tz::Tz;

use crate::{
    Error,
    account::{AccountId, account_exists},
    auth::AuthContext,
    transaction::date::parse_timestamp,
};

/// The database ID of a [Transaction].
pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// A movement of money recorded against a debit and a credit account.
///
/// The ledger only checks that both accounts exist and differ, it does not
/// check that the books balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction's ID in the application database.
    pub id: TransactionId,
    /// When the transaction happened, always in UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Signed amount. Negative amounts are allowed.
    pub amount: f64,
    /// What the transaction was for. Never blank.
    pub description: String,
    /// The account the amount is debited to.
    pub debit_account_id: AccountId,
    /// The account the amount is credited from.
    pub credit_account_id: AccountId,
}

/// Transaction fields as sent by a JSON client, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFields {
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub debit_account_id: Option<AccountId>,
    pub credit_account_id: Option<AccountId>,
}

/// The validated fields for a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: OffsetDateTime,
    pub amount: f64,
    pub description: String,
    pub debit_account_id: AccountId,
    pub credit_account_id: AccountId,
}

fn validate_amount(amount: f64) -> Result<f64, Error> {
    if amount.is_finite() {
        Ok(amount)
    } else {
        Err(Error::InvalidAmount(amount))
    }
}

fn validate_description(description: &str) -> Result<String, Error> {
    if description.trim().is_empty() {
        Err(Error::MissingField("description"))
    } else {
        Ok(description.to_owned())
    }
}

impl NewTransaction {
    /// Validate raw fields, reading dates without an offset in `timezone`.
    ///
    /// # Errors
    ///
    /// Returns [Error::MissingField] for the first absent field, checked in the
    /// order date, amount, description, debit_account_id, credit_account_id.
    /// A blank description counts as absent. Also returns [Error::InvalidDate]
    /// or [Error::InvalidAmount] for values that cannot be used.
    pub fn from_fields(
        fields: &TransactionFields,
        timezone: &Tz,
    ) -> Result<Self, Error> {
        let date = fields.date.as_deref().ok_or(Error::MissingField("date"))?;
        let amount = fields.amount.ok_or(Error::MissingField("amount"))?;
        let description = fields
            .description
            .as_deref()
            .ok_or(Error::MissingField("description"))
            .and_then(validate_description)?;
        let debit_account_id = fields
            .debit_account_id
            .ok_or(Error::MissingField("debit_account_id"))?;
        let credit_account_id = fields
            .credit_account_id
            .ok_or(Error::MissingField("credit_account_id"))?;

        Ok(Self {
            date: parse_timestamp(date, timezone)?,
            amount: validate_amount(amount)?,
            description,
            debit_account_id,
            credit_account_id,
        })
    }
}

/// The validated changes to an existing transaction. `None` leaves the field
/// as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub date: Option<OffsetDateTime>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub debit_account_id: Option<AccountId>,
    pub credit_account_id: Option<AccountId>,
}

impl TransactionPatch {
    /// Validate the fields that are present, the same way as on creation.
    pub fn from_fields(
        fields: &TransactionFields,
        timezone: &Tz,
    ) -> Result<Self, Error> {
        Ok(Self {
            date: fields
                .date
                .as_deref()
                .map(|date| parse_timestamp(date, timezone))
                .transpose()?,
            amount: fields.amount.map(validate_amount).transpose()?,
            description: fields
                .description
                .as_deref()
                .map(validate_description)
                .transpose()?,
            debit_account_id: fields.debit_account_id,
            credit_account_id: fields.credit_account_id,
        })
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            debit_account_id INTEGER NOT NULL,
            credit_account_id INTEGER NOT NULL,
            FOREIGN KEY(debit_account_id) REFERENCES account(id)
                ON UPDATE CASCADE ON DELETE RESTRICT,
            FOREIGN KEY(credit_account_id) REFERENCES account(id)
                ON UPDATE CASCADE ON DELETE RESTRICT,
            CHECK (debit_account_id != credit_account_id)
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_debit_account
            ON \"transaction\"(debit_account_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_credit_account
            ON \"transaction\"(credit_account_id);",
    )
}

pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        description: row.get(3)?,
        debit_account_id: row.get(4)?,
        credit_account_id: row.get(5)?,
    })
}

fn check_accounts(
    debit_account_id: AccountId,
    credit_account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    for account_id in [debit_account_id, credit_account_id] {
        if !account_exists(account_id, connection)? {
            return Err(Error::InvalidAccount(account_id));
        }
    }

    if debit_account_id == credit_account_id {
        return Err(Error::SameAccount(debit_account_id));
    }

    Ok(())
}

/// Record a new transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::Unauthorized] for an anonymous caller,
/// - [Error::InvalidAccount] if either account does not exist, checking the debit account first,
/// - [Error::SameAccount] if the debit and credit accounts are the same,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    auth: &AuthContext,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    auth.user()?;
    check_accounts(
        new_transaction.debit_account_id,
        new_transaction.credit_account_id,
        connection,
    )?;

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\"
                (date, amount, description, debit_account_id, credit_account_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, date, amount, description, debit_account_id, credit_account_id",
        )?
        .query_row(
            (
                new_transaction.date,
                new_transaction.amount,
                new_transaction.description,
                new_transaction.debit_account_id,
                new_transaction.credit_account_id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get the transaction with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction.
pub fn get_transaction(
    auth: &AuthContext,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    auth.user()?;

    connection
        .prepare(
            "SELECT id, date, amount, description, debit_account_id, credit_account_id
             FROM \"transaction\" WHERE id = ?1",
        )?
        .query_row([id], map_transaction_row)
        .map_err(Error::from)
}

/// Get every transaction in the order they were recorded.
pub fn get_all_transactions(
    auth: &AuthContext,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    auth.user()?;

    connection
        .prepare(
            "SELECT id, date, amount, description, debit_account_id, credit_account_id
             FROM \"transaction\" ORDER BY id",
        )?
        .query_map([], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Apply `patch` to the transaction with `id` and return the result.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no such transaction,
/// - [Error::InvalidAccount] if the patch names an account that does not exist,
/// - or [Error::SameAccount] if the merged transaction would use one account for both sides.
pub fn update_transaction(
    auth: &AuthContext,
    id: TransactionId,
    patch: TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let current = get_transaction(auth, id, connection)?;

    let debit_account_id = patch.debit_account_id.unwrap_or(current.debit_account_id);
    let credit_account_id = patch.credit_account_id.unwrap_or(current.credit_account_id);
    check_accounts(debit_account_id, credit_account_id, connection)?;

    let transaction = connection
        .prepare(
            "UPDATE \"transaction\"
             SET date = ?1, amount = ?2, description = ?3,
                 debit_account_id = ?4, credit_account_id = ?5
             WHERE id = ?6
             RETURNING id, date, amount, description, debit_account_id, credit_account_id",
        )?
        .query_row(
            (
                patch.date.unwrap_or(current.date),
                patch.amount.unwrap_or(current.amount),
                patch.description.unwrap_or(current.description),
                debit_account_id,
                credit_account_id,
                id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Remove the transaction with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such transaction.
pub fn delete_transaction(
    auth: &AuthContext,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    auth.user()?;

    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// How many transactions use `account_id` on either side.
pub fn count_transactions_for_account(
    account_id: AccountId,
    connection: &Connection,
) -> Result<u64, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM \"transaction\"
         WHERE debit_account_id = ?1 OR credit_account_id = ?1",
        [account_id],
        |row| row.get(0),
    )?;

    Ok(count.unsigned_abs())
}
