//! Bookkeeper is a web app for keeping the books of a small organisation: named
//! accounts and the double-entry transactions that move money between them.
//!
//! This library serves the same account and transaction registries through two
//! surfaces: HTML pages driven by HTMX forms, and a JSON REST API under `/api`.
//! Both are gated by a session cookie.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod alert;
mod api;
mod app_state;
mod auth;
mod db;
mod endpoints;
mod flash;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountId, AccountType};
pub use app_state::AppState;
pub use auth::{PasswordHash, Role, User, UserID, ValidatedPassword, count_users, create_user};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use timezone::get_local_timezone;
pub use transaction::{Transaction, TransactionId};

use crate::{
    alert::Alert,
    internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Could not listen for the ctrl+c signal: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate_signal) => {
                terminate_signal.recv().await;
            }
            Err(error) => {
                tracing::error!("Could not listen for the terminate signal: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
///
/// The `Display` text of the client-facing variants is shown to users as-is,
/// so it is written as a full sentence.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The username does not exist or the password did not match.
    #[error("Invalid username or password.")]
    InvalidCredentials,

    /// The caller tried to use a guarded operation without logging in.
    #[error("You must be logged in to do that.")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("The requested resource could not be found.")]
    NotFound,

    /// Another account already uses this name.
    #[error("Account name already exists: an account named \"{0}\" is already in the books.")]
    DuplicateName(String),

    /// The account type is not one of the supported account types.
    #[error(
        "\"{0}\" is not a valid account type. \
        Use one of Asset, Liability, Equity, Revenue or Expense."
    )]
    InvalidType(String),

    /// A transaction referred to an account ID that does not exist.
    #[error("Invalid account ID: no account exists with the ID {0}.")]
    InvalidAccount(AccountId),

    /// A transaction date that could not be parsed as an ISO 8601 timestamp.
    #[error("Invalid date format: could not read \"{0}\" as an ISO 8601 date.")]
    InvalidDate(String),

    /// A transaction amount that is not a finite number.
    #[error("Invalid amount: {0} is not a finite number.")]
    InvalidAmount(f64),

    /// A required field was absent or blank.
    #[error("The field \"{0}\" is required.")]
    MissingField(&'static str),

    /// A transaction used the same account for its debit and credit side.
    #[error("The debit and credit accounts must be different, got account {0} for both.")]
    SameAccount(AccountId),

    /// The account is referenced by transactions and cannot be deleted.
    #[error(
        "The account is used by {transaction_count} transaction(s). \
        Delete or move those transactions before deleting the account."
    )]
    AccountInUse {
        /// How many transactions refer to the account.
        transaction_count: u64,
    },

    /// The request body could not be read as the expected JSON document.
    #[error("Could not read the request body: {0}")]
    MalformedRequest(String),

    /// The username is already taken by another user.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The auth or flash cookie is missing, expired or could not be read.
    #[error("cookie error: {0}")]
    CookieError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::Unauthorized => Redirect::to(endpoints::LOG_IN_VIEW).into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

const UNEXPECTED_ERROR_MESSAGE: &str =
    "An unexpected error occurred, check the server logs for more details.";

impl Error {
    /// The HTTP status code that best describes this error.
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials
            | Error::DuplicateName(_)
            | Error::InvalidType(_)
            | Error::InvalidAccount(_)
            | Error::InvalidDate(_)
            | Error::InvalidAmount(_)
            | Error::MissingField(_)
            | Error::SameAccount(_)
            | Error::MalformedRequest(_)
            | Error::DuplicateUsername(_)
            | Error::TooWeak(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::AccountInUse { .. } => StatusCode::CONFLICT,
            Error::HashingError(_)
            | Error::InvalidTimezoneError(_)
            | Error::CookieError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A short, stable, machine readable name for the error used in JSON responses.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Error::InvalidCredentials => "invalid_credentials",
            Error::Unauthorized => "unauthorized",
            Error::NotFound => "not_found",
            Error::DuplicateName(_) => "duplicate_name",
            Error::InvalidType(_) => "invalid_type",
            Error::InvalidAccount(_) => "invalid_account",
            Error::InvalidDate(_) => "invalid_date",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::MissingField(_) => "missing_field",
            Error::SameAccount(_) => "same_account",
            Error::AccountInUse { .. } => "account_in_use",
            Error::MalformedRequest(_) => "malformed_request",
            Error::DuplicateUsername(_) => "duplicate_username",
            Error::TooWeak(_) => "password_too_weak",
            Error::HashingError(_)
            | Error::InvalidTimezoneError(_)
            | Error::CookieError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => "internal_error",
        }
    }

    /// Render the error as a JSON body `{"error": code, "message": text}`.
    ///
    /// Server errors are logged and replaced with a generic message.
    pub(crate) fn into_json_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
            UNEXPECTED_ERROR_MESSAGE.to_owned()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.code(),
                "message": message,
            })),
        )
            .into_response()
    }

    /// Render the error as an HTML alert fragment for HTMX requests.
    pub(crate) fn into_alert_response(self) -> Response {
        let status = self.status_code();
        let (message, details) = match &self {
            Error::NotFound => (
                "Not found",
                "The item could not be found. \
                Try refreshing the page to see if it has already been deleted."
                    .to_owned(),
            ),
            Error::AccountInUse { .. } => ("Could not delete account", self.to_string()),
            Error::DuplicateName(_) => ("Duplicate account name", self.to_string()),
            Error::Unauthorized => ("Not logged in", self.to_string()),
            Error::InvalidTimezoneError(timezone) => (
                "Invalid Timezone Settings",
                format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            error if status.is_client_error() => ("Invalid input", error.to_string()),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                ("Something went wrong", UNEXPECTED_ERROR_MESSAGE.to_owned())
            }
        };

        (
            status,
            Alert::Error {
                message: message.to_owned(),
                details,
            },
        )
            .into_response()
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::Value;

    use crate::{
        Error,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    async fn json_body(error: Error) -> (StatusCode, Value) {
        let response = error.into_json_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not read response body");

        (
            status,
            serde_json::from_slice(&body).expect("Could not parse body as JSON"),
        )
    }

    #[tokio::test]
    async fn client_errors_include_message() {
        let (status, body) = json_body(Error::InvalidAccount(2)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_account");
        assert_eq!(
            body["message"],
            "Invalid account ID: no account exists with the ID 2."
        );
    }

    #[tokio::test]
    async fn unauthorized_is_401() {
        let (status, body) = json_body(Error::Unauthorized).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn account_in_use_is_conflict() {
        let (status, body) = json_body(Error::AccountInUse {
            transaction_count: 3,
        })
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "account_in_use");
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = json_body(Error::HashingError("secret detail".to_owned())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert!(
            !body["message"]
                .as_str()
                .unwrap_or_default()
                .contains("secret detail"),
            "internal error details should not be sent to the client"
        );
    }

    #[tokio::test]
    async fn alert_response_has_status_and_valid_html() {
        let response = Error::DuplicateName("Cash".to_owned()).into_alert_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Duplicate account name"), "got {text:?}");
        assert!(text.contains("Account name already exists"), "got {text:?}");
    }
}
