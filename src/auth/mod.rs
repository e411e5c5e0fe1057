//! Users, sessions and the middleware that guards the routes.

mod context;
mod cookie;
mod log_in_page;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod token;
mod user;

pub use context::{AuthContext, log_in};
pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use log_in_page::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{api_auth_context, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use redirect::normalize_redirect_url;
pub(crate) use token::Token;
pub use user::{
    Role, User, UserID, count_users, create_user, create_user_table, get_user_by_id,
    get_user_by_username,
};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
