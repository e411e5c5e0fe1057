//! The form shared by the create and edit account pages.

use maud::{Markup, html};

use crate::{
    Error,
    account::{AccountFields, AccountType},
    alert::ALERT_CONTAINER_ID,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, submit_button},
};

/// Where the form is submitted to.
pub(super) enum AccountFormAction<'a> {
    Create(&'a str),
    Update(&'a str),
}

/// Messages shown next to the fields that failed validation.
#[derive(Debug, Default, PartialEq)]
pub(super) struct AccountFormErrors {
    pub name: Option<String>,
    pub account_type: Option<String>,
}

impl AccountFormErrors {
    /// Turn a validation error into a message for the field it is about.
    ///
    /// Errors that are not about a single field are handed back.
    pub fn from_error(error: Error) -> Result<Self, Error> {
        match error {
            Error::MissingField("name") => Ok(Self {
                name: Some("Please enter a name".to_owned()),
                ..Default::default()
            }),
            Error::DuplicateName(ref name) => Ok(Self {
                name: Some(format!("An account named \"{name}\" already exists")),
                ..Default::default()
            }),
            Error::MissingField("type") => Ok(Self {
                account_type: Some("Please select an account type".to_owned()),
                ..Default::default()
            }),
            Error::InvalidType(ref raw) => Ok(Self {
                account_type: Some(format!("\"{raw}\" is not an account type")),
                ..Default::default()
            }),
            error => Err(error),
        }
    }
}

fn field_error(message: Option<&str>) -> Markup {
    html! {
        @if let Some(message) = message {
            p class="mt-2 text-sm text-red-600 dark:text-red-400" { (message) }
        }
    }
}

pub(super) fn account_form_view(
    action: AccountFormAction<'_>,
    fields: &AccountFields,
    errors: &AccountFormErrors,
) -> Markup {
    let (hx_post, hx_put, button_label) = match action {
        AccountFormAction::Create(endpoint) => (Some(endpoint), None, "Create Account"),
        AccountFormAction::Update(endpoint) => (None, Some(endpoint), "Update Account"),
    };
    let name = fields.name.as_deref().unwrap_or_default();
    let selected_type = fields.account_type.as_deref().unwrap_or_default();

    html! {
        form
            hx-post=[hx_post]
            hx-put=[hx_put]
            hx-swap="outerHTML"
            hx-target-error={ "#" (ALERT_CONTAINER_ID) }
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="e.g. Cash"
                    value=(name)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);

                (field_error(errors.name.as_deref()))
            }

            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }

                select id="type" name="type" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" disabled selected[selected_type.is_empty()] { "Select a type" }

                    @for account_type in AccountType::ALL {
                        option
                            value=(account_type.as_str())
                            selected[selected_type == account_type.as_str()]
                        {
                            (account_type.as_str())
                        }
                    }
                }

                (field_error(errors.account_type.as_deref()))
            }

            (submit_button(button_label))
        }
    }
}
