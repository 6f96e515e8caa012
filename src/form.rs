//! Reading session parameters out of an edition form.

use scraper::{Html, Selector};
use std::collections::BTreeMap;

use crate::error::{RelEditError, Result};
use crate::models::{Reload, SessionParams};

/// Name/value pairs of every hidden input in `markup`, in document order.
pub fn hidden_fields(markup: &str) -> Result<Vec<(String, String)>> {
    let selector = Selector::parse("input[type='hidden']")
        .map_err(|e| RelEditError::MalformedResponse(format!("bad selector: {e:?}")))?;
    let fragment = Html::parse_fragment(markup);
    let fields = fragment
        .select(&selector)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect();
    Ok(fields)
}

/// Collect the fields named `{prefix}{key}` into typed session parameters.
/// Later fields override earlier ones. `divid` and `formid` are required.
pub fn session_params<'a, I>(fields: I, prefix: &str) -> Result<SessionParams>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut collected: BTreeMap<String, String> = fields
        .into_iter()
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(prefix)?;
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect();

    let div_id = collected
        .remove("divid")
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RelEditError::MalformedResponse("session field divid missing".into()))?;
    let form_id = collected
        .remove("formid")
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RelEditError::MalformedResponse("session field formid missing".into()))?;
    let reload = collected
        .remove("reload")
        .map(|raw| Reload::from_field(&raw))
        .unwrap_or_default();

    Ok(SessionParams {
        div_id,
        form_id,
        reload,
        extras: collected,
    })
}
