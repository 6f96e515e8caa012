use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Identifier of an addressable zone of the document.
pub type RegionId = String;

/// A named zone whose content can be fetched and replaced independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    /// Endpoint the region loads itself from
    pub load_url: Option<String>,
    /// True until content has been fetched into the region
    pub has_placeholder: bool,
    /// Refetch even when already filled
    pub is_reloadable: bool,
}

impl Region {
    /// A region rendered with a placeholder, waiting for its content.
    pub fn lazy(id: impl Into<RegionId>, load_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            load_url: Some(load_url.into()),
            has_placeholder: true,
            is_reloadable: false,
        }
    }

    /// A region whose content shipped with the page.
    pub fn filled(id: impl Into<RegionId>) -> Self {
        Self {
            id: id.into(),
            load_url: None,
            has_placeholder: false,
            is_reloadable: false,
        }
    }

    pub fn reloadable(mut self, reloadable: bool) -> Self {
        self.is_reloadable = reloadable;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
        }
    }
}

/// A call to a server side function whose result fills `region`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub region: RegionId,
    pub function_name: String,
    /// Positional arguments, JSON encoded one per `arg` parameter
    pub args: Vec<Value>,
    /// Named parameters sent as is
    pub params: Vec<(String, String)>,
    pub method: Method,
}

impl FetchRequest {
    pub fn new(region: impl Into<RegionId>, function_name: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            function_name: function_name.into(),
            args: Vec::new(),
            params: Vec::new(),
            method: Method::Get,
        }
    }

    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Wire parameters: `fname`, optional `pageid`, one `arg` per positional
    /// argument, then the named parameters.
    pub fn encode(&self, page_id: Option<&str>) -> Vec<(String, String)> {
        let mut params = vec![("fname".to_string(), self.function_name.clone())];
        if let Some(page_id) = page_id {
            params.push(("pageid".to_string(), page_id.to_string()));
        }
        for arg in &self.args {
            params.push(("arg".to_string(), arg.to_string()));
        }
        params.extend(self.params.iter().cloned());
        params
    }
}

/// A fetched fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Markup(String),
    Json(Value),
}

impl Content {
    /// Markup view of the content; structured data is serialized.
    pub fn as_markup(&self) -> Cow<'_, str> {
        match self {
            Content::Markup(markup) => Cow::Borrowed(markup),
            Content::Json(Value::String(markup)) => Cow::Borrowed(markup),
            Content::Json(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Message carried by a server error document, if this is one.
    ///
    /// Error documents are JSON objects holding an `error` string, or a
    /// `reason` next to a status other than `ok`.
    pub fn error_message(&self) -> Option<String> {
        let Content::Json(Value::Object(map)) = self else {
            return None;
        };
        if let Some(Value::String(error)) = map.get("error") {
            return Some(error.clone());
        }
        let failed = map
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|status| !status.eq_ignore_ascii_case("ok"));
        match map.get("reason") {
            Some(Value::String(reason)) if failed => Some(reason.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapMode {
    /// Replace the region's children
    Replace,
    /// Replace the region node itself
    Swap,
    Append,
    Prepend,
    /// Replace the children and flip the region's visibility
    ToggleVisibility,
}

/// How a completed fetch ended inside the swap engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// Committed into the region
    Applied,
    /// A newer request owns the region; the result was dropped
    Superseded,
}

/// What to do with the page once an edition succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Reload {
    /// Refresh the edited region only
    #[default]
    No,
    /// Reload the whole page in place
    Page,
    /// Navigate to this url
    Navigate(String),
}

impl Reload {
    /// Interpret a JSON reload value: `true` reloads, a non-empty string navigates.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Reload::Page,
            Value::String(url) if !url.is_empty() => Reload::Navigate(url.clone()),
            Value::Number(n) if n.as_f64().is_some_and(|n| n != 0.0) => Reload::Page,
            _ => Reload::No,
        }
    }

    /// Interpret a hidden field value. The field holds JSON; anything that is
    /// not valid JSON is taken as a bare url.
    pub fn from_field(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Reload::No;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Reload::from_value(&value),
            Err(_) => Reload::Navigate(raw.to_string()),
        }
    }

    /// JSON form sent to the server when opening a form.
    pub fn to_param(&self) -> String {
        match self {
            Reload::No => "false".to_string(),
            Reload::Page => "true".to_string(),
            Reload::Navigate(url) => Value::String(url.clone()).to_string(),
        }
    }
}

/// Body returned by a form submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reload: Option<Value>,
    #[serde(default, alias = "targetDivId", alias = "divid")]
    pub div_id: Option<String>,
    #[serde(default, alias = "formId", alias = "formid")]
    pub form_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SubmitResponse {
    /// A `reason` without any status counts as a failure.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && match self.status.as_deref() {
                Some(status) => status.eq_ignore_ascii_case("ok"),
                None => self.reason.is_none(),
            }
    }

    /// Best message for a failed answer: `error`, then `reason`, then the status.
    pub fn failure_message(&self) -> Option<String> {
        self.error
            .clone()
            .or_else(|| self.reason.clone())
            .or_else(|| self.status.clone())
    }
}

/// Session parameters carried by the edition form's prefixed hidden fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionParams {
    pub div_id: String,
    pub form_id: String,
    #[serde(skip)]
    pub reload: Reload,
    /// Remaining session fields (eid, rtype, role, vid, action...)
    pub extras: BTreeMap<String, String>,
}

impl SessionParams {
    /// Parameters posted back to refresh the edited region.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("divid".to_string(), self.div_id.clone()),
            ("formid".to_string(), self.form_id.clone()),
            ("reload".to_string(), self.reload.to_param()),
        ];
        params.extend(self.extras.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

/// Arguments of an inline edition form opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditFormArgs {
    pub form_id: String,
    pub eid: u64,
    /// Attribute or relation type being edited
    pub rtype: String,
    /// `subject` or `object`
    pub role: String,
    pub div_id: String,
    pub reload: Reload,
    pub vid: String,
    pub action: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RegisterRegionRequest {
    pub id: String,
    pub load_url: Option<String>,
    /// Region still shows its placeholder
    pub placeholder: Option<bool>,
    pub reloadable: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadRegionRequest {
    pub id: String,
    pub reloadable: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ShowRegionRequest {
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct OpenEditFormRequest {
    pub form_id: String,
    pub eid: u64,
    pub rtype: String,
    pub role: String,
    pub div_id: String,
    /// `true`, `false` or a url to navigate to after success
    pub reload: Option<String>,
    pub vid: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SubmitEditRequest {
    pub div_id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CancelEditRequest {
    pub div_id: String,
}
