//! Schema set up and the unit of work that request handlers run registry
//! operations in.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, Transaction};

use crate::{
    Error, account::create_account_table, auth::create_user_table,
    transaction::create_transaction_table,
};

/// Create the tables for the domain models if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, since SQLite
/// leaves it off by default and the transaction table relies on it.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the statements fail.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Run `operation` inside a database transaction.
///
/// The transaction is committed if `operation` returns `Ok`, otherwise it is
/// rolled back when dropped. Registry functions take `&Connection`, which the
/// transaction derefs to.
///
/// # Errors
/// Returns the error from `operation`, or an [Error::SqlError] if the
/// transaction could not be started or committed.
pub fn with_unit_of_work<T>(
    connection: &mut Connection,
    operation: impl FnOnce(&Transaction) -> Result<T, Error>,
) -> Result<T, Error> {
    let transaction = connection.transaction()?;
    let value = operation(&transaction)?;
    transaction.commit()?;

    Ok(value)
}

/// Lock the shared connection, logging and mapping a poisoned lock to
/// [Error::DatabaseLockError].
pub(crate) fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}
