//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    account::{
        create_account_endpoint, delete_account_endpoint, get_accounts_page,
        get_edit_account_page, get_new_account_page, update_account_endpoint,
    },
    api::{
        create_account_api, create_transaction_api, delete_account_api, delete_transaction_api,
        get_account_api, get_accounts_api, get_current_user_api, get_transaction_api,
        get_transactions_api, post_log_in_api, post_log_out_api, update_account_api,
        update_transaction_api,
    },
    auth::{api_auth_context, auth_guard, auth_guard_hx, get_log_in_page, get_log_out, post_log_in},
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_edit_transaction_page,
        get_new_transaction_page, get_transactions_page, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(
            endpoints::LOG_IN_VIEW,
            get(get_log_in_page).post(post_log_in),
        )
        .route(endpoints::LOG_OUT_VIEW, get(get_log_out))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        )
        .route(endpoints::LOG_IN_API, post(post_log_in_api))
        .route(endpoints::LOG_OUT_API, post(post_log_out_api));

    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::ACCOUNTS_VIEW, get(get_accounts_page))
        .route(endpoints::NEW_ACCOUNT_VIEW, get(get_new_account_page))
        .route(endpoints::EDIT_ACCOUNT_VIEW, get(get_edit_account_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            get(get_new_transaction_page),
        )
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let hx_routes = Router::new()
        .route(endpoints::NEW_ACCOUNT_VIEW, post(create_account_endpoint))
        .route(
            endpoints::ACCOUNT,
            put(update_account_endpoint).delete(delete_account_endpoint),
        )
        .route(
            endpoints::NEW_TRANSACTION_VIEW,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    let api_routes = Router::new()
        .route(endpoints::CURRENT_USER_API, get(get_current_user_api))
        .route(
            endpoints::ACCOUNTS_API,
            get(get_accounts_api).post(create_account_api),
        )
        .route(
            endpoints::ACCOUNTS_API_NO_SLASH,
            get(get_accounts_api).post(create_account_api),
        )
        .route(
            endpoints::ACCOUNT_API,
            get(get_account_api)
                .put(update_account_api)
                .delete(delete_account_api),
        )
        .route(
            endpoints::TRANSACTIONS_API,
            get(get_transactions_api).post(create_transaction_api),
        )
        .route(
            endpoints::TRANSACTIONS_API_NO_SLASH,
            get(get_transactions_api).post(create_transaction_api),
        )
        .route(
            endpoints::TRANSACTION_API,
            get(get_transaction_api)
                .put(update_transaction_api)
                .delete(delete_transaction_api),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_auth_context,
        ));

    page_routes
        .merge(hx_routes)
        .merge(api_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the accounts page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::ACCOUNTS_VIEW)
}
