/// Prefix carried by hidden form fields that belong to the edition session.
pub const SESSION_PREFIX: &str = "__reledit|";

/// Form id of the delete confirmation form; submitting it always reloads the page.
pub const DELETE_CONFIRMATION_FORM: &str = "deleteconf";

/// Event emitted once a region has been refreshed after a successful edition.
pub const RELEDIT_RELOADED: &str = "reledit-reloaded";

/// Event emitted after any committed swap.
pub const CONTENT_LOADED: &str = "server-response";

/// Server function rendering the inline edition form (and its refreshed value).
pub const RELEDIT_FORM_FUNCTION: &str = "reledit_form";

/// Server function rendering a registered component.
pub const COMPONENT_FUNCTION: &str = "component";

/// Region holding the fetched form or refreshed value: `{divid}-reledit`.
pub const RELEDIT_SUFFIX: &str = "-reledit";

/// Static value display: `{divid}-value`.
pub const VALUE_SUFFIX: &str = "-value";

/// Edition form display: `{divid}-form`.
pub const FORM_SUFFIX: &str = "-form";

pub fn reledit_region(div_id: &str) -> String {
    format!("{div_id}{RELEDIT_SUFFIX}")
}

pub fn value_region(div_id: &str) -> String {
    format!("{div_id}{VALUE_SUFFIX}")
}

pub fn form_region(div_id: &str) -> String {
    format!("{div_id}{FORM_SUFFIX}")
}
