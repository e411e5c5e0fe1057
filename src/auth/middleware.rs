//! Authentication middleware that resolves the session cookie, extends sessions, and handles redirects.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        AuthContext,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        get_user_by_id,
        redirect::build_log_in_redirect_url,
    },
    db::lock_connection,
    endpoints,
};

/// The state needed for the auth middleware
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// Used to check that the user in the cookie still exists.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// Work out who sent the request from the auth cookie in `jar`.
///
/// A missing, expired or unreadable token is [AuthContext::Anonymous], as is
/// a token for a user that has since been deleted.
///
/// # Errors
///
/// Returns an error only if the user store could not be queried.
pub fn resolve_auth_context(
    jar: &PrivateCookieJar,
    connection: &Connection,
) -> Result<AuthContext, Error> {
    let token = match get_token_from_cookies(jar) {
        Ok(token) => token,
        Err(_) => return Ok(AuthContext::Anonymous),
    };

    match get_user_by_id(token.user_id, connection) {
        Ok(user) => Ok(AuthContext::Authenticated(user)),
        Err(Error::NotFound) => {
            tracing::warn!(
                "Auth cookie refers to user {} who no longer exists.",
                token.user_id
            );
            Ok(AuthContext::Anonymous)
        }
        Err(error) => Err(error),
    }
}

fn resolve_from_parts(
    state: &AuthState,
    parts: &Parts,
) -> Result<(PrivateCookieJar, AuthContext), Error> {
    let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());

    let connection = lock_connection(&state.db_connection)?;
    let auth_context = resolve_auth_context(&jar, &connection)?;

    Ok((jar, auth_context))
}

/// Slide the session expiry forward and copy the updated cookie onto `response`.
fn extend_session(jar: PrivateCookieJar, duration: Duration, response: Response) -> Response {
    let jar = match extend_auth_cookie_duration_if_needed(jar.clone(), duration) {
        Ok(updated_jar) => updated_jar,
        Err(error) => {
            tracing::error!("Error extending cookie duration: {error}. Rolling back cookie jar.");
            jar
        }
    };

    let (mut parts, body) = response.into_parts();
    for (key, value) in jar.into_response().headers().iter() {
        if key == SET_COOKIE {
            parts.headers.append(key, value.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

/// Run the request if it carries a valid session, otherwise respond with
/// `get_redirect` applied to the log-in URL.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let log_in_redirect_url = build_log_in_redirect_url(&request).unwrap_or_else(|| {
        tracing::warn!("Could not build a redirect URL for the request. Using the log-in page.");
        endpoints::LOG_IN_VIEW.to_owned()
    });

    let (mut parts, body) = request.into_parts();
    let (jar, auth_context) = match resolve_from_parts(&state, &parts) {
        Ok(resolved) => resolved,
        Err(error) => return error.into_response(),
    };

    if !auth_context.is_authenticated() {
        return get_redirect(&log_in_redirect_url);
    }

    parts.extensions.insert(auth_context);
    let response = next.run(Request::from_parts(parts, body)).await;

    extend_session(jar, state.cookie_duration, response)
}

/// Middleware for the HTML pages.
///
/// Requests without a valid session are redirected to the log-in page with
/// a 303 See Other, and the requested page as the `redirect_url`.
/// Handlers can take an [AuthContext] argument to receive the logged in user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware for the HTMX endpoints behind the HTML pages.
///
/// Like [auth_guard], but uses an `HX-Redirect` header so that HTMX
/// navigates the whole page instead of swapping the log-in page into a form.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}

/// Middleware for the JSON API.
///
/// Never rejects a request. The resolved [AuthContext] is handed to the
/// handler, and the account and transaction operations refuse anonymous
/// callers themselves.
pub async fn api_auth_context(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let (jar, auth_context) = match resolve_from_parts(&state, &parts) {
        Ok(resolved) => resolved,
        Err(error) => return error.into_json_response(),
    };

    let is_authenticated = auth_context.is_authenticated();
    parts.extensions.insert(auth_context);
    let response = next.run(Request::from_parts(parts, body)).await;

    if is_authenticated {
        extend_session(jar, state.cookie_duration, response)
    } else {
        response
    }
}

#[cfg(test)]
mod auth_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::State,
        http::StatusCode,
        middleware,
        routing::{get, post},
    };
    use axum_extra::extract::{
        PrivateCookieJar,
        cookie::{Cookie, Key, SameSite},
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        api::ApiError,
        auth::{
            AuthContext, COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, PasswordHash, Role, UserID,
            create_user, create_user_table, set_auth_cookie,
        },
        endpoints,
    };

    use super::{AuthState, api_auth_context, auth_guard, auth_guard_hx};

    async fn whoami(auth: AuthContext) -> Result<String, Error> {
        Ok(auth.user()?.username.clone())
    }

    async fn api_whoami(auth: AuthContext) -> Result<String, ApiError> {
        Ok(auth.user()?.username.clone())
    }

    async fn stub_log_in_route(
        State(state): State<AuthState>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        set_auth_cookie(jar, UserID::new(1), state.cookie_duration)
    }

    const TEST_LOG_IN_ROUTE: &str = "/test/log_in";
    const TEST_PROTECTED_ROUTE: &str = "/protected";
    const TEST_HX_ROUTE: &str = "/protected/hx";
    const TEST_API_ROUTE: &str = "/api/protected";

    fn get_test_server(cookie_duration: Duration) -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        create_user(
            "alice",
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            &connection,
        )
        .unwrap();

        let state = AuthState {
            cookie_key: Key::from(&Sha512::digest("nafstenoas")),
            cookie_duration,
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let page_routes = Router::new()
            .route(TEST_PROTECTED_ROUTE, get(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));
        let hx_routes = Router::new()
            .route(TEST_HX_ROUTE, post(whoami))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));
        let api_routes = Router::new()
            .route(TEST_API_ROUTE, get(api_whoami))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                api_auth_context,
            ));

        let app = Router::new()
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .merge(page_routes)
            .merge(hx_routes)
            .merge(api_routes)
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    async fn log_in(server: &TestServer) -> Cookie<'static> {
        let response = server.post(TEST_LOG_IN_ROUTE).await;
        response.assert_status_ok();

        response.cookie(COOKIE_TOKEN)
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[tokio::test]
    async fn protected_route_with_valid_cookie_sees_user() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let token_cookie = log_in(&server).await;

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await;

        response.assert_status_ok();
        response.assert_text("alice");
    }

    #[tokio::test]
    async fn protected_route_extends_short_session() {
        let server = get_test_server(Duration::seconds(5));
        let token_cookie = log_in(&server).await;

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(token_cookie)
            .await;

        // The guard extends by the configured duration, which is 5 seconds here.
        let auth_cookie = response.cookie(COOKIE_TOKEN);
        assert_date_time_close(
            auth_cookie.expires_datetime().unwrap(),
            OffsetDateTime::now_utc() + Duration::seconds(5),
        );
        assert_eq!(auth_cookie.secure(), Some(true));
        assert_eq!(auth_cookie.http_only(), Some(true));
        assert_eq!(auth_cookie.same_site(), Some(SameSite::Strict));
    }

    #[tokio::test]
    async fn protected_route_without_cookie_redirects_to_log_in() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.get(TEST_PROTECTED_ROUTE).await;

        response.assert_status_see_other();
        let expected_query =
            serde_urlencoded::to_string([("redirect_url", TEST_PROTECTED_ROUTE)]).unwrap();
        assert_eq!(
            response.header("location"),
            format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query)
        );
    }

    #[tokio::test]
    async fn protected_route_with_garbage_cookie_redirects_to_log_in() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server
            .get(TEST_PROTECTED_ROUTE)
            .add_cookie(Cookie::new(COOKIE_TOKEN, "FOOBAR"))
            .await;

        response.assert_status_see_other();
    }

    #[tokio::test]
    async fn hx_route_uses_hx_current_url_for_redirect() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let current_url = "/accounts/2/edit";

        let response = server
            .post(TEST_HX_ROUTE)
            .add_header("HX-Request", "true")
            .add_header("HX-Current-URL", format!("http://localhost{current_url}"))
            .await;

        response.assert_status_ok();
        let expected_query = serde_urlencoded::to_string([("redirect_url", current_url)]).unwrap();
        assert_eq!(
            response.header("hx-redirect"),
            format!("{}?{}", endpoints::LOG_IN_VIEW, expected_query)
        );
    }

    #[tokio::test]
    async fn api_route_passes_anonymous_context_through() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);

        let response = server.get(TEST_API_ROUTE).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_route_passes_user_through() {
        let server = get_test_server(DEFAULT_COOKIE_DURATION);
        let token_cookie = log_in(&server).await;

        let response = server.get(TEST_API_ROUTE).add_cookie(token_cookie).await;

        response.assert_status_ok();
        response.assert_text("alice");
    }
}
