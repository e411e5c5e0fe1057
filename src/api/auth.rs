use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    Error,
    api::{ApiError, ApiState, run},
    auth::{AuthContext, Role, User, UserID, invalidate_auth_cookie, log_in, set_auth_cookie},
};

/// The credentials sent to the log in endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LogInRequest {
    username: Option<String>,
    password: Option<String>,
}

/// The user as reported by the API. Never includes the password hash.
#[derive(Debug, PartialEq, Serialize)]
pub struct UserResponse {
    id: UserID,
    username: String,
    role: Role,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// `POST /api/auth/login` with `{username, password}`.
///
/// Sets the auth cookie and returns the user on success.
pub async fn post_log_in_api(
    State(state): State<ApiState>,
    jar: PrivateCookieJar,
    body: Result<Json<LogInRequest>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<UserResponse>), ApiError> {
    let Json(request) = body?;
    let username = request.username.ok_or(Error::MissingField("username"))?;
    let password = request.password.ok_or(Error::MissingField("password"))?;

    let auth = run(&state.db_connection, |uow| log_in(&username, &password, uow))
        .inspect_err(|_| tracing::info!("failed log in attempt for {username}"))?;
    let user = auth.user()?;
    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;
    tracing::info!("user {} logged in", user.id);

    Ok((jar, Json(UserResponse::from(user))))
}

/// `POST /api/auth/logout`. Always succeeds.
pub async fn post_log_out_api(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<Value>) {
    (
        invalidate_auth_cookie(jar),
        Json(json!({ "message": "Logged out successfully." })),
    )
}

/// `GET /api/auth/user`: the logged in user.
pub async fn get_current_user_api(auth: AuthContext) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(UserResponse::from(auth.user()?)))
}
