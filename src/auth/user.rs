//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The part a user plays in keeping the books.
///
/// Roles are recorded and reported but do not restrict any operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Sets up the books.
    Admin,
    /// Records transactions.
    User,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parse a role, ignoring case, so "admin" and "Admin" are both accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("admin") {
            Ok(Role::Admin)
        } else if s.eq_ignore_ascii_case("user") {
            Ok(Role::User)
        } else {
            Err(format!("unknown role \"{s}\", expected admin or user"))
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: String| FromSqlError::Other(error.into()))
    }
}

/// A user of the application.
///
/// The caller should ensure that `id` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's role.
    pub role: Role,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                role TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateUsername] if `username` is already taken,
/// - [Error::SqlError] if another SQL related error occurred.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .execute(
            "INSERT INTO user (username, password, role) VALUES (?1, ?2, ?3)",
            (username, password_hash.as_ref(), role),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::DuplicateUsername(username.to_owned())
            }
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        password_hash,
        role,
    })
}

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        role: row.get(3)?,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password, role FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the user with the given `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password, role FROM user WHERE username = :username")?
        .query_row(&[(":username", &username)], map_row_to_user)
        .map_err(|error| error.into())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, PasswordHash};

    use super::{
        Role, UserID, count_users, create_user, create_user_table, get_user_by_id,
        get_user_by_username,
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let connection = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let inserted_user =
            create_user("alice", password_hash.clone(), Role::Admin, &connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.username, "alice");
        assert_eq!(inserted_user.password_hash, password_hash);
        assert_eq!(inserted_user.role, Role::Admin);
    }

    #[test]
    fn insert_duplicate_username_fails() {
        let connection = get_db_connection();
        create_user(
            "alice",
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            &connection,
        )
        .unwrap();

        let result = create_user(
            "alice",
            PasswordHash::new_unchecked("hunter3"),
            Role::User,
            &connection,
        );

        assert_eq!(result, Err(Error::DuplicateUsername("alice".to_owned())));
    }

    #[test]
    fn get_user_by_id_and_username() {
        let connection = get_db_connection();
        let want = create_user(
            "bob",
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            &connection,
        )
        .unwrap();

        assert_eq!(get_user_by_id(want.id, &connection), Ok(want.clone()));
        assert_eq!(get_user_by_username("bob", &connection), Ok(want));
    }

    #[test]
    fn get_missing_user_is_not_found() {
        let connection = get_db_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_user_by_username("nobody", &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn count_users_counts_inserted_users() {
        let connection = get_db_connection();
        assert_eq!(count_users(&connection), Ok(0));

        create_user(
            "carol",
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            &connection,
        )
        .unwrap();

        assert_eq!(count_users(&connection), Ok(1));
    }

    #[test]
    fn parse_role_ignores_case() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("User".parse::<Role>(), Ok(Role::User));
        assert!("root".parse::<Role>().is_err());
    }
}
