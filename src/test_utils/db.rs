use rusqlite::Connection;

use crate::{
    auth::{AuthContext, PasswordHash, Role, User, UserID},
    db::initialize,
};

/// An in-memory database with every table created and foreign keys on.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

pub(crate) fn test_user() -> User {
    User {
        id: UserID::new(1),
        username: "test".to_owned(),
        password_hash: PasswordHash::new_unchecked("hunter2"),
        role: Role::Admin,
    }
}

/// A logged in caller for the registry functions.
pub(crate) fn test_auth() -> AuthContext {
    AuthContext::Authenticated(test_user())
}
