//! Alerts for reporting the outcome of an HTMX request to the user.
//!
//! Success alerts are sent as an out-of-band swap so that they show up no
//! matter what the request swapped in. Error alerts replace the alert
//! container directly; forms and buttons point `hx-target-error` at it.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// The id of the element in the base page that alerts are swapped into.
pub const ALERT_CONTAINER_ID: &str = "alert-container";

/// A message to show in the alert container.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with no extra details.
    SuccessSimple {
        /// The headline.
        message: String,
    },
    /// An error message.
    Error {
        /// The headline.
        message: String,
        /// What went wrong and how the user could fix it.
        details: String,
    },
}

impl Alert {
    fn is_success(&self) -> bool {
        matches!(self, Alert::SuccessSimple { .. })
    }

    /// Render the alert wrapped in the alert container.
    pub fn into_html(self) -> Markup {
        let out_of_band = self.is_success().then_some("true");
        let (message, details, is_success) = match self {
            Alert::SuccessSimple { message } => (message, None, true),
            Alert::Error { message, details } => (message, Some(details), false),
        };

        html! {
            div
                id=(ALERT_CONTAINER_ID)
                hx-swap-oob=[out_of_band]
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                (alert_box(is_success, &message, details.as_deref()))
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Html(self.into_html().into_string()).into_response()
    }
}

/// The styled box shared by alerts and flash messages.
pub fn alert_box(is_success: bool, message: &str, details: Option<&str>) -> Markup {
    let style = if is_success {
        "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
        dark:bg-gray-800 dark:text-green-400 border border-green-300 dark:border-green-800"
    } else {
        "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
        dark:bg-gray-800 dark:text-red-400 border border-red-300 dark:border-red-800"
    };

    html! {
        div class=(style) role="alert"
        {
            span class="font-medium" { (message) }

            @if let Some(details) = details.filter(|details| !details.is_empty()) {
                p class="mt-1" { (details) }
            }
        }
    }
}
