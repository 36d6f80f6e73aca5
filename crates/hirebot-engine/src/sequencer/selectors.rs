//! Page targets of the hiring site.

use hirebot_common::protocol::Target;

pub fn login_email() -> Target {
    Target::css(r#"input[data-test-id="input-test-id-login"]"#)
}

pub fn login_pin() -> Target {
    Target::css(r#"input[data-test-id="input-test-id-pin"]"#)
}

pub fn country_toggle() -> Target {
    Target::css("#country-toggle-button")
}

pub fn country_option(country: &str) -> Target {
    Target::with_text(r#"ul[role="listbox"] li"#, &[country])
}

/// The "Continue" row under the email field.
pub fn email_continue() -> Target {
    Target::with_text(r#"div[data-test-component="StencilReactRow"]"#, &["Continue"])
}

pub fn pin_continue() -> Target {
    Target::css(r#"button[data-test-id="button-continue"]"#)
}

pub fn consent_button() -> Target {
    Target::css(r#"button[data-test-component="StencilReactButton"][data-test-id="consentBtn"]"#)
}

pub fn schedule_link() -> Target {
    Target::css(r#"div[data-test-component='StencilText'] em"#)
}

pub fn schedule_dropdown() -> Target {
    Target::css(r#"div[data-test-component="StencilReactRow"].jobDetailScheduleDropdown"#)
}

pub fn schedule_card() -> Target {
    Target::css(".scheduleCardLabelText")
}

pub fn shift_card() -> Target {
    Target::css(r#"div[data-test-component="StencilReactCard"][role="button"].focusableItem"#)
}

pub fn apply_button() -> Target {
    Target::css(r#"button[data-test-id="jobDetailApplyButtonDesktop"]"#)
}

pub fn create_application() -> Target {
    Target::with_text("button", &["Create Application", "Submit Application"])
}

/// URL fragment of the application pages.
pub const APPLICATION_PATH: &str = "/application/";
