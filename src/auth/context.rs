//! Who is making a request.
//!
//! Every account and transaction operation takes an [AuthContext] and asks it
//! for the current user before touching the database.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use rusqlite::Connection;

use crate::{
    Error,
    auth::{User, get_user_by_username},
};

/// The caller of an operation: nobody, or a logged in user.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthContext {
    /// No valid session.
    #[default]
    Anonymous,
    /// A valid session for this user.
    Authenticated(User),
}

impl AuthContext {
    /// The logged in user.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthorized] for [AuthContext::Anonymous].
    pub fn user(&self) -> Result<&User, Error> {
        match self {
            AuthContext::Anonymous => Err(Error::Unauthorized),
            AuthContext::Authenticated(user) => Ok(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::Authenticated(_))
    }
}

/// Handlers receive the context resolved by the auth middleware, or
/// [AuthContext::Anonymous] on routes the middleware does not cover.
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Check a username and password against the user store.
///
/// # Errors
///
/// Returns [Error::InvalidCredentials] if the username is unknown or the
/// password does not match. The two cases are not distinguished.
pub fn log_in(username: &str, password: &str, connection: &Connection) -> Result<AuthContext, Error> {
    let user = match get_user_by_username(username, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    if user.password_hash.verify(password)? {
        Ok(AuthContext::Authenticated(user))
    } else {
        Err(Error::InvalidCredentials)
    }
}

#[cfg(test)]
mod auth_context_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{PasswordHash, Role, ValidatedPassword, create_user, create_user_table},
    };

    use super::{AuthContext, log_in};

    fn get_connection_with_user() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        let password_hash =
            PasswordHash::new(ValidatedPassword::new("correcthorsebatterystaple").unwrap(), 4)
                .unwrap();
        create_user("alice", password_hash, Role::Admin, &connection).unwrap();

        connection
    }

    #[test]
    fn anonymous_has_no_user() {
        assert_eq!(AuthContext::Anonymous.user(), Err(Error::Unauthorized));
        assert!(!AuthContext::Anonymous.is_authenticated());
    }

    #[test]
    fn log_in_with_correct_password() {
        let connection = get_connection_with_user();

        let context = log_in("alice", "correcthorsebatterystaple", &connection).unwrap();

        let user = context.user().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn log_in_with_wrong_password() {
        let connection = get_connection_with_user();

        let result = log_in("alice", "wrong password", &connection);

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[test]
    fn log_in_with_unknown_username() {
        let connection = get_connection_with_user();

        let result = log_in("mallory", "correcthorsebatterystaple", &connection);

        assert_eq!(result, Err(Error::InvalidCredentials));
    }
}
