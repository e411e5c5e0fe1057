//! The account registry: the named buckets that transactions move money between.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::AuthContext, transaction::count_transactions_for_account};

/// The database ID of an [Account]. Assigned by SQLite, starting from 1.
pub type AccountId = i64;

/// The five kinds of account in double-entry bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// Something the organisation owns, e.g. a bank account.
    Asset,
    /// Something the organisation owes, e.g. a loan.
    Liability,
    /// The owners' stake in the organisation.
    Equity,
    /// Money earned, e.g. sales.
    Revenue,
    /// Money spent, e.g. rent.
    Expense,
}

impl AccountType {
    /// Every account type, in the order they are offered in the UI.
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    /// The name of the account type as stored and sent over the wire, e.g. "Asset".
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Equity => "Equity",
            AccountType::Revenue => "Revenue",
            AccountType::Expense => "Expense",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    /// Parse an account type. The spelling must match exactly, e.g. "Asset" but not "asset".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|account_type| account_type.as_str() == s)
            .ok_or_else(|| Error::InvalidType(s.to_owned()))
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// A named account in the books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The account's ID in the application database.
    pub id: AccountId,
    /// Unique across all accounts. Case-sensitive.
    pub name: String,
    /// What kind of account this is.
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

/// Account fields as sent by a client, before validation.
///
/// Shared by the JSON API and the HTML forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFields {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

/// The validated fields for a new account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
}

impl NewAccount {
    /// Validate raw fields.
    ///
    /// # Errors
    ///
    /// Returns [Error::MissingField] for an absent or blank name or type, and
    /// [Error::InvalidType] for a type that is not one of the five account types.
    pub fn from_fields(fields: &AccountFields) -> Result<Self, Error> {
        let name = non_blank(fields.name.as_deref()).ok_or(Error::MissingField("name"))?;
        let account_type =
            non_blank(fields.account_type.as_deref()).ok_or(Error::MissingField("type"))?;

        Ok(Self {
            name: name.to_owned(),
            account_type: account_type.parse()?,
        })
    }
}

/// The validated changes to an existing account. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
}

impl AccountPatch {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [Error::MissingField] for a blank name and [Error::InvalidType]
    /// for an unknown type.
    pub fn from_fields(fields: &AccountFields) -> Result<Self, Error> {
        let name = match fields.name.as_deref() {
            Some(name) if name.trim().is_empty() => return Err(Error::MissingField("name")),
            name => name.map(str::to_owned),
        };
        let account_type = fields
            .account_type
            .as_deref()
            .map(str::parse)
            .transpose()?;

        Ok(Self { name, account_type })
    }
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            account_type TEXT NOT NULL
                CHECK (account_type IN ('Asset', 'Liability', 'Equity', 'Revenue', 'Expense'))
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: row.get(2)?,
    })
}

fn map_unique_violation(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(sql_error, _)
            if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateName(name.to_owned())
        }
        error => error.into(),
    }
}

/// Add an account to the books.
///
/// # Errors
///
/// Returns [Error::Unauthorized] for an anonymous caller and
/// [Error::DuplicateName] if an account already has this name.
pub fn create_account(
    auth: &AuthContext,
    new_account: NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    auth.user()?;

    connection
        .query_row(
            "INSERT INTO account (name, account_type) VALUES (?1, ?2)
            RETURNING id, name, account_type",
            (&new_account.name, new_account.account_type),
            map_row_to_account,
        )
        .map_err(|error| map_unique_violation(error, &new_account.name))
}

/// Get the account with `id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such account.
pub fn get_account(
    auth: &AuthContext,
    id: AccountId,
    connection: &Connection,
) -> Result<Account, Error> {
    auth.user()?;

    connection
        .query_row(
            "SELECT id, name, account_type FROM account WHERE id = ?1",
            [id],
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// Get every account in the order they were created.
pub fn get_all_accounts(auth: &AuthContext, connection: &Connection) -> Result<Vec<Account>, Error> {
    auth.user()?;

    connection
        .prepare("SELECT id, name, account_type FROM account ORDER BY id")?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Apply `patch` to the account with `id` and return the result.
///
/// An empty patch returns the account unchanged.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such account and
/// [Error::DuplicateName] if another account already has the new name.
pub fn update_account(
    auth: &AuthContext,
    id: AccountId,
    patch: AccountPatch,
    connection: &Connection,
) -> Result<Account, Error> {
    let current = get_account(auth, id, connection)?;

    let name = patch.name.unwrap_or(current.name);
    let account_type = patch.account_type.unwrap_or(current.account_type);

    connection
        .query_row(
            "UPDATE account SET name = ?1, account_type = ?2 WHERE id = ?3
            RETURNING id, name, account_type",
            (&name, account_type, id),
            map_row_to_account,
        )
        .map_err(|error| map_unique_violation(error, &name))
}

/// Remove the account with `id` from the books.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such account and
/// [Error::AccountInUse] if any transaction refers to it.
pub fn delete_account(auth: &AuthContext, id: AccountId, connection: &Connection) -> Result<(), Error> {
    get_account(auth, id, connection)?;

    let transaction_count = count_transactions_for_account(id, connection)?;
    if transaction_count > 0 {
        return Err(Error::AccountInUse { transaction_count });
    }

    connection.execute("DELETE FROM account WHERE id = ?1", [id])?;

    Ok(())
}

/// Whether an account with `id` exists.
pub fn account_exists(id: AccountId, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM account WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

#[cfg(test)]
mod account_type_tests {
    use crate::Error;

    use super::AccountType;

    #[test]
    fn parses_exact_spellings() {
        for account_type in AccountType::ALL {
            assert_eq!(account_type.as_str().parse(), Ok(account_type));
        }
    }

    #[test]
    fn rejects_other_spellings() {
        assert_eq!(
            "asset".parse::<AccountType>(),
            Err(Error::InvalidType("asset".to_owned()))
        );
        assert_eq!(
            "Cash".parse::<AccountType>(),
            Err(Error::InvalidType("Cash".to_owned()))
        );
    }

    #[test]
    fn serializes_as_plain_name() {
        assert_eq!(
            serde_json::to_string(&AccountType::Liability).unwrap(),
            "\"Liability\""
        );
    }
}

#[cfg(test)]
mod account_fields_tests {
    use crate::Error;

    use super::{AccountFields, AccountPatch, AccountType, NewAccount};

    fn fields(name: Option<&str>, account_type: Option<&str>) -> AccountFields {
        AccountFields {
            name: name.map(str::to_owned),
            account_type: account_type.map(str::to_owned),
        }
    }

    #[test]
    fn new_account_requires_name_then_type() {
        assert_eq!(
            NewAccount::from_fields(&fields(None, None)),
            Err(Error::MissingField("name"))
        );
        assert_eq!(
            NewAccount::from_fields(&fields(Some("   "), Some("Asset"))),
            Err(Error::MissingField("name"))
        );
        assert_eq!(
            NewAccount::from_fields(&fields(Some("Cash"), None)),
            Err(Error::MissingField("type"))
        );
    }

    #[test]
    fn new_account_rejects_unknown_type() {
        assert_eq!(
            NewAccount::from_fields(&fields(Some("Cash"), Some("Money"))),
            Err(Error::InvalidType("Money".to_owned()))
        );
    }

    #[test]
    fn new_account_from_valid_fields() {
        assert_eq!(
            NewAccount::from_fields(&fields(Some("Cash"), Some("Asset"))),
            Ok(NewAccount {
                name: "Cash".to_owned(),
                account_type: AccountType::Asset
            })
        );
    }

    #[test]
    fn patch_keeps_absent_fields_empty() {
        assert_eq!(
            AccountPatch::from_fields(&fields(None, None)),
            Ok(AccountPatch::default())
        );
        assert_eq!(
            AccountPatch::from_fields(&fields(None, Some("Expense"))),
            Ok(AccountPatch {
                name: None,
                account_type: Some(AccountType::Expense)
            })
        );
    }

    #[test]
    fn patch_rejects_blank_name() {
        assert_eq!(
            AccountPatch::from_fields(&fields(Some(""), None)),
            Err(Error::MissingField("name"))
        );
    }

    #[test]
    fn deserializes_type_field() {
        let fields: AccountFields =
            serde_json::from_str(r#"{"name": "Cash", "type": "Asset"}"#).unwrap();

        assert_eq!(fields.name.as_deref(), Some("Cash"));
        assert_eq!(fields.account_type.as_deref(), Some("Asset"));
    }
}
