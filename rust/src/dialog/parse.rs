use serde_json::{Map, Value};

use super::{ButtonSpec, Color, DialogBehavior, DialogSpec, DialogStyle, DEFAULT_TITLE};
use crate::actions::ActionKind;
use crate::host::ButtonRole;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Parses popup configuration JSON into a [`DialogSpec`].
///
/// Only malformed JSON or a non-object document is an error. Every absent or
/// wrongly-typed field takes its default, so any JSON object parses.
/// `version_field` names the top-level key carrying the version identifier.
pub fn parse(json_text: &str, version_field: &str) -> Result<DialogSpec, ParseError> {
    let value: Value = serde_json::from_str(json_text)?;
    let obj = match value {
        Value::Object(obj) => obj,
        other => return Err(ParseError::NotAnObject(json_kind(&other))),
    };

    let title = text_field(&obj, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let message = text_field(&obj, "message").unwrap_or_default();

    let buttons = ButtonRole::ALL
        .into_iter()
        .filter_map(|role| parse_button(&obj, role))
        .collect();

    let nested = obj.get("behavior").and_then(Value::as_object);
    let behavior_flag = |key: &str, default: bool| {
        bool_field(&obj, key)
            .or_else(|| nested.and_then(|b| bool_field(b, key)))
            .unwrap_or(default)
    };
    let defaults = DialogBehavior::default();
    let behavior = DialogBehavior {
        cancelable: behavior_flag("cancelable", defaults.cancelable),
        dim_background: behavior_flag("dimBackground", defaults.dim_background),
    };

    let style = obj
        .get("style")
        .and_then(Value::as_object)
        .map(parse_style)
        .filter(|s| !s.is_empty());

    // Same trimming as `ignore_version` data.
    let version = text_field(&obj, version_field)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    Ok(DialogSpec {
        title,
        message,
        buttons,
        behavior,
        style,
        version,
    })
}

fn button_key(role: ButtonRole) -> &'static str {
    match role {
        ButtonRole::Positive => "positiveButton",
        ButtonRole::Negative => "negativeButton",
        ButtonRole::Neutral => "neutralButton",
    }
}

fn parse_button(obj: &Map<String, Value>, role: ButtonRole) -> Option<ButtonSpec> {
    let button = obj.get(button_key(role))?.as_object()?;
    let text = text_field(button, "text").filter(|t| !t.is_empty())?;
    let action = text_field(button, "action")
        .map(|a| ActionKind::from_wire(&a))
        .unwrap_or_default();
    let data = text_field(button, "data").unwrap_or_default();
    Some(ButtonSpec {
        role,
        text,
        action,
        data,
    })
}

fn parse_style(style: &Map<String, Value>) -> DialogStyle {
    let color = |key: &str| {
        let raw = text_field(style, key)?;
        let parsed = Color::parse(&raw);
        if parsed.is_none() {
            tracing::debug!(key, "dropping unparseable color");
        }
        parsed
    };
    DialogStyle {
        title_color: color("titleColor"),
        message_color: color("messageColor"),
        positive_button_color: color("positiveButtonColor"),
        negative_button_color: color("negativeButtonColor"),
        neutral_button_color: color("neutralButtonColor"),
    }
}

/// Strings as-is; numbers and booleans stringified; anything else is absent.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
