//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The rest of the auth module handles the lower level authentication and cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{invalidate_auth_cookie, log_in, normalize_redirect_url, set_auth_cookie},
    db::lock_connection,
    endpoints,
    flash::{Flash, set_flash, take_flash},
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, log_in_card, password_input, submit_button},
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

const INVALID_CREDENTIALS_ERROR_MSG: &str = "Invalid username or password.";
const INTERNAL_ERROR_MSG: &str = "An internal error occurred. Please try again later.";

fn log_in_form(username: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_VIEW)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#username, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus
                    value=(username);
            }

            (password_input("", error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Keep me logged in for one week"
                }
            }

            (submit_button("Log in"))
        }
    }
}

fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    let redirect_url = raw_url.and_then(normalize_redirect_url);

    if let (None, Some(raw_url)) = (&redirect_url, raw_url) {
        tracing::warn!("Invalid redirect URL from {source}: {raw_url}");
    }

    redirect_url
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Display the log-in page along with any pending flash message.
pub async fn get_log_in_page(
    Query(query): Query<RedirectQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (jar, flash) = take_flash(jar);
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");

    let form = log_in_form("", None, redirect_url.as_deref());
    let content = html! {
        @if let Some(flash) = flash {
            (flash.into_html())
        }

        (log_in_card("Log in to your account", &form))
    };

    (jar, base("Log In", &content)).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
#[derive(Clone, Deserialize)]
pub struct LogInData {
    pub username: String,

    /// Compared against the stored hash, so there is nothing to validate here.
    pub password: String,

    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// Any `Some` value means "remember me".
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

/// Handler for log-in requests from the log-in form.
///
/// On success the auth cookie is set and the client is redirected to
/// `redirect_url`, or the accounts page if there is none.
/// Otherwise, the form is returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let redirect_url = parse_redirect_url(user_data.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();
    let render_error = |message: &str| {
        log_in_form(&user_data.username, Some(message), redirect_url).into_response()
    };

    let auth_context = match lock_connection(&state.db_connection)
        .and_then(|connection| log_in(&user_data.username, &user_data.password, &connection))
    {
        Ok(auth_context) => auth_context,
        Err(Error::InvalidCredentials) => {
            tracing::info!("Failed log-in attempt for {:?}", user_data.username);
            return render_error(INVALID_CREDENTIALS_ERROR_MSG);
        }
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return render_error(INTERNAL_ERROR_MSG);
        }
    };
    let user_id = match auth_context.user() {
        Ok(user) => user.id,
        Err(error) => {
            tracing::error!("Log in did not produce a user: {error}");
            return render_error(INTERNAL_ERROR_MSG);
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let redirect_url = redirect_url.unwrap_or(endpoints::ACCOUNTS_VIEW);

    match set_auth_cookie(jar.clone(), user_id, cookie_duration) {
        Ok(updated_jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(redirect_url.to_owned()),
            set_flash(updated_jar, &Flash::success("Logged in successfully.")),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}
