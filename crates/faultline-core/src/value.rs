//! Coercion of arbitrary JSON values into error records.
//!
//! Error trees often arrive as plain JSON (logs, wire payloads, fixture
//! files). Objects are read field by field; anything else becomes a
//! placeholder record that remembers the original value so the renderer can
//! still describe it.

use serde_json::Value;

use crate::types::{Additional, ErrorRecord, ErrorRef};

/// Build a record from any JSON value.
///
/// Recognised object keys: `name`, `message`, `client_safe_message`,
/// `status_code`, `field`, `generic`, `stack`, `errors`, `fields`, `from`,
/// `additional`. Unknown keys are ignored. Arrays are not unwrapped here;
/// the renderer and projector each apply their own sequence rule.
pub fn from_value(value: &Value) -> ErrorRef {
    let Value::Object(map) = value else {
        return ErrorRecord {
            raw: Some(value.clone()),
            ..ErrorRecord::default()
        }
        .into_ref();
    };

    let text = |key: &str| map.get(key).and_then(text_of);

    ErrorRecord {
        name: text("name"),
        // A present but null message still reads as text.
        message: map.get("message").map(|message| match message {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        client_safe_message: text("client_safe_message"),
        status_code: map
            .get("status_code")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok()),
        field: map.get("field").and_then(Value::as_str).map(str::to_owned),
        generic: map.get("generic").and_then(Value::as_bool).unwrap_or(false),
        stack: map.get("stack").and_then(Value::as_str).map(str::to_owned),
        errors: match map.get("errors") {
            Some(Value::Array(items)) => items.iter().map(from_value).collect(),
            _ => Vec::new(),
        },
        fields: match map.get("fields") {
            Some(Value::Object(fields)) => Some(
                fields
                    .iter()
                    .map(|(path, sub)| (path.clone(), from_value(sub)))
                    .collect(),
            ),
            _ => None,
        },
        from: map.get("from").filter(|v| !v.is_null()).map(from_value),
        additional: map
            .get("additional")
            .filter(|v| !v.is_null())
            .cloned()
            .map(Additional::Json),
        kind: None,
        raw: (!map.contains_key("message")).then(|| value.clone()),
    }
    .into_ref()
}

/// Wrap a sequence of errors in an `Array` record (empty message).
pub fn wrap_sequence(errors: Vec<ErrorRef>) -> ErrorRef {
    ErrorRecord {
        name: Some("Array".into()),
        message: Some(String::new()),
        errors,
        ..ErrorRecord::default()
    }
    .into_ref()
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
