//! One-shot messages that survive a redirect.
//!
//! A flash is stored in a private cookie by the handler that redirects and
//! removed by the page that displays it, so it is shown exactly once.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::alert::alert_box;

pub(crate) const COOKIE_FLASH: &str = "flash";

/// A success message to show on the next page the user visits.
///
/// Failures are reported in place with an [Alert](crate::alert::Alert)
/// instead, so there is no error flash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
}

impl Flash {
    pub fn success(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }

    pub fn into_html(self) -> Markup {
        html! {
            div id="flash" class="w-full max-w-md mx-auto px-4 pt-4"
            {
                (alert_box(true, &self.message, None))
            }
        }
    }
}

/// Store `flash` in the cookie jar, replacing any earlier flash.
pub fn set_flash(jar: PrivateCookieJar, flash: &Flash) -> PrivateCookieJar {
    let value = match serde_json::to_string(flash) {
        Ok(value) => value,
        Err(error) => {
            tracing::error!("Could not serialize flash message {flash:?}: {error}");
            return jar;
        }
    };

    jar.add(
        Cookie::build((COOKIE_FLASH, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Remove the flash from the cookie jar and return it.
///
/// A flash cookie that cannot be read is discarded.
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(COOKIE_FLASH) else {
        return (jar, None);
    };

    let flash = match serde_json::from_str::<Flash>(cookie.value_trimmed()) {
        Ok(flash) => Some(flash),
        Err(error) => {
            tracing::warn!("Discarding unreadable flash cookie: {error}");
            None
        }
    };

    (jar.remove(Cookie::build(COOKIE_FLASH).path("/")), flash)
}
