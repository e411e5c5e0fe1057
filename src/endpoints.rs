//! The endpoint URIs for the HTML pages and the JSON API.
//!
//! For endpoints that take a parameter, e.g., '/accounts/{account_id}', use [format_endpoint].

/// The root route which redirects to the accounts page or log in page.
pub const ROOT: &str = "/";
/// The page listing all accounts.
pub const ACCOUNTS_VIEW: &str = "/accounts";
/// The page for creating a new account. Also accepts the form submission.
pub const NEW_ACCOUNT_VIEW: &str = "/accounts/new";
/// The page for editing an existing account.
pub const EDIT_ACCOUNT_VIEW: &str = "/accounts/{account_id}/edit";
/// The route for updating (PUT) or deleting (DELETE) an account from the HTML pages.
pub const ACCOUNT: &str = "/accounts/{account_id}";
/// The page listing all transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for creating a new transaction. Also accepts the form submission.
pub const NEW_TRANSACTION_VIEW: &str = "/transactions/new";
/// The page for editing an existing transaction.
pub const EDIT_TRANSACTION_VIEW: &str = "/transactions/{transaction_id}/edit";
/// The route for updating (PUT) or deleting (DELETE) a transaction from the HTML pages.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";
/// The route for getting the log in page. Also accepts the form submission.
pub const LOG_IN_VIEW: &str = "/auth/login";
/// The route for logging out from the HTML pages.
pub const LOG_OUT_VIEW: &str = "/auth/logout";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user with a JSON body.
pub const LOG_IN_API: &str = "/api/auth/login";
/// The route for logging out the current user.
pub const LOG_OUT_API: &str = "/api/auth/logout";
/// The route for getting the currently logged in user.
pub const CURRENT_USER_API: &str = "/api/auth/user";
/// The route to list and create accounts.
pub const ACCOUNTS_API: &str = "/api/accounts/";
/// [ACCOUNTS_API] without the trailing slash.
pub const ACCOUNTS_API_NO_SLASH: &str = "/api/accounts";
/// The route to get, update and delete a single account.
pub const ACCOUNT_API: &str = "/api/accounts/{account_id}";
/// The route to list and create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions/";
/// [TRANSACTIONS_API] without the trailing slash.
pub const TRANSACTIONS_API_NO_SLASH: &str = "/api/transactions";
/// The route to get, update and delete a single transaction.
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/accounts/{account_id}', '{account_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "{uri} is not a valid URI");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::NEW_ACCOUNT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::EDIT_ACCOUNT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNT);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_VIEW);
        assert_endpoint_is_valid_uri(endpoints::NEW_TRANSACTION_VIEW);
        assert_endpoint_is_valid_uri(endpoints::EDIT_TRANSACTION_VIEW);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::LOG_IN_VIEW);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT_VIEW);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);

        assert_endpoint_is_valid_uri(endpoints::LOG_IN_API);
        assert_endpoint_is_valid_uri(endpoints::LOG_OUT_API);
        assert_endpoint_is_valid_uri(endpoints::CURRENT_USER_API);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS_API);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS_API_NO_SLASH);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNT_API);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_API);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_API_NO_SLASH);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION_API);
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }

    #[test]
    fn parameter_in_middle() {
        let formatted_path = format_endpoint(endpoints::EDIT_ACCOUNT_VIEW, 42);

        assert_eq!(formatted_path, "/accounts/42/edit");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }
}
