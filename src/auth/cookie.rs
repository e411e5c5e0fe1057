//! Reading and writing the auth cookie.
//!
//! The cookie holds a JSON encoded [Token] and lives in a [PrivateCookieJar],
//! so the client can neither read nor forge it.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Token, UserID},
};

pub(crate) const COOKIE_TOKEN: &str = "token";

/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(30);

fn build_token_cookie(token: &Token) -> Result<Cookie<'static>, Error> {
    let value =
        serde_json::to_string(token).map_err(|error| Error::CookieError(error.to_string()))?;

    Ok(Cookie::build((COOKIE_TOKEN, value))
        .path("/")
        .expires(token.expires_at)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(true)
        .build())
}

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// The cookie expires `duration` from now.
///
/// # Errors
///
/// Returns [Error::CookieError] if the expiry overflows or the token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = Token::new(user_id, duration)?;

    Ok(jar.add(build_token_cookie(&token)?))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read the token from the auth cookie.
///
/// # Errors
///
/// Returns [Error::CookieError] if the cookie is missing, cannot be parsed
/// or has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar
        .get(COOKIE_TOKEN)
        .ok_or_else(|| Error::CookieError("auth cookie missing".to_owned()))?;
    let token: Token = serde_json::from_str(cookie.value_trimmed())
        .map_err(|error| Error::CookieError(error.to_string()))?;

    if token.is_expired() {
        return Err(Error::CookieError("auth cookie expired".to_owned()));
    }

    Ok(token)
}

/// Push the auth cookie's expiry out to at least `duration` from now.
///
/// An expiry that is already later, e.g. from "remember me", is kept.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;
    let extended = Token::new(token.user_id, duration)?;

    let token = Token {
        expires_at: max(token.expires_at, extended.expires_at),
        ..token
    };

    Ok(jar.add(build_token_cookie(&token)?))
}

#[cfg(test)]
mod cookie_tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};
    use time::{Duration, OffsetDateTime};

    use crate::{Error, auth::UserID};

    use super::{
        COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, extend_auth_cookie_duration_if_needed,
        get_token_from_cookies, invalidate_auth_cookie, set_auth_cookie,
    };

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(Key::from(&Sha512::digest(b"cookie secret")))
    }

    #[track_caller]
    fn assert_date_time_close(left: OffsetDateTime, right: OffsetDateTime) {
        assert!(
            (left - right).abs() < Duration::seconds(1),
            "got date time {left:?}, want {right:?}"
        );
    }

    #[test]
    fn set_cookie_round_trips_user_id() {
        let jar = set_auth_cookie(get_jar(), UserID::new(3), DEFAULT_COOKIE_DURATION).unwrap();

        let token = get_token_from_cookies(&jar).unwrap();

        assert_eq!(token.user_id, UserID::new(3));
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION,
        );
    }

    #[test]
    fn cookie_has_secure_attributes() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let cookie = jar.get(COOKIE_TOKEN).unwrap();

        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(-5)).unwrap();

        assert!(matches!(
            get_token_from_cookies(&jar),
            Err(Error::CookieError(_))
        ));
    }

    #[test]
    fn missing_cookie_is_rejected() {
        assert!(matches!(
            get_token_from_cookies(&get_jar()),
            Err(Error::CookieError(_))
        ));
    }

    #[test]
    fn extend_pushes_short_expiry_out() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::seconds(5)).unwrap();

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10)).unwrap();

        let token = get_token_from_cookies(&jar).unwrap();
        assert_date_time_close(
            token.expires_at,
            OffsetDateTime::now_utc() + Duration::minutes(10),
        );
    }

    #[test]
    fn extend_keeps_longer_expiry() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), Duration::days(7)).unwrap();
        let want = get_token_from_cookies(&jar).unwrap().expires_at;

        let jar = extend_auth_cookie_duration_if_needed(jar, Duration::minutes(10)).unwrap();

        assert_eq!(get_token_from_cookies(&jar).unwrap().expires_at, want);
    }

    #[test]
    fn invalidated_cookie_is_rejected() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let jar = invalidate_auth_cookie(jar);

        let cookie = jar.get(COOKIE_TOKEN).unwrap();
        assert_eq!(cookie.value(), "deleted");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert!(get_token_from_cookies(&jar).is_err());
    }
}
