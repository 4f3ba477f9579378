//! Step argument templates
//!
//! `{{name}}` and `{{current.name}}` look up a key of the bound record,
//! `{{current}}` renders the whole record.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::suite::render_record;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").expect("placeholder regex is valid"));

/// Substitute every placeholder in `template` from `record`
pub fn render(template: &str, record: Option<&Value>) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(path)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = lookup(record, path.as_str()).ok_or_else(|| Error::UnresolvedTemplate {
            variable: path.as_str().to_string(),
        })?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&render_record(value));
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

fn lookup<'a>(record: Option<&'a Value>, path: &str) -> Option<&'a Value> {
    let record = record?;
    let mut segments = path.split('.').peekable();
    if segments.peek() == Some(&"current") {
        segments.next();
    }

    segments.try_fold(record, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
