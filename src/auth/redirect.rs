//! Where to send a user after they log in.
//!
//! Only same-site absolute paths are accepted as redirect targets, and never
//! the log-in page itself.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

fn is_safe_redirect_url(redirect_url: &str) -> bool {
    if !redirect_url.starts_with('/') || redirect_url.starts_with("//") {
        return false;
    }

    let path = redirect_url
        .split_once('?')
        .map_or(redirect_url, |(path, _)| path);

    path != endpoints::LOG_IN_VIEW
}

/// Reduce `raw_url` to a safe path and query, or `None` if it points
/// somewhere a user should not be sent.
pub fn normalize_redirect_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

/// HTMX sends the full URL of the page, so the host is dropped here.
fn normalize_hx_current_url(raw_url: &str) -> Option<String> {
    let uri = raw_url.parse::<Uri>().ok()?;
    let path_and_query = uri.path_and_query()?.as_str();

    is_safe_redirect_url(path_and_query).then(|| path_and_query.to_owned())
}

fn is_hx_request(request: &Request) -> bool {
    request
        .headers()
        .get("hx-request")
        .and_then(|header| header.to_str().ok())
        .is_some_and(|header| header.eq_ignore_ascii_case("true"))
}

/// The log-in URL that will bring the user back to what they were doing.
///
/// For HTMX requests that is the page the request was sent from, otherwise
/// it is the requested page.
pub fn build_log_in_redirect_url(request: &Request) -> Option<String> {
    let redirect_target = if is_hx_request(request) {
        let current_url = request
            .headers()
            .get("hx-current-url")
            .and_then(|header| header.to_str().ok())?;
        let target = normalize_hx_current_url(current_url);
        if target.is_none() {
            tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
        }
        target?
    } else {
        normalize_redirect_url(request.uri().path_and_query()?.as_str())?
    };

    build_log_in_redirect_url_from_target(&redirect_target)
}

/// `/auth/login?redirect_url=<target>` with the target URL encoded.
pub fn build_log_in_redirect_url_from_target(redirect_target: &str) -> Option<String> {
    match serde_urlencoded::to_string([("redirect_url", redirect_target)]) {
        Ok(param) => Some(format!("{}?{}", endpoints::LOG_IN_VIEW, param)),
        Err(error) => {
            tracing::error!("Could not encode redirect URL {redirect_target}: {error}");
            None
        }
    }
}
