//! JSON projector: a redacted, externally safe view of an error tree.
//!
//! A [`Projection`] says which record fields are emitted and under which
//! keys; an [`Exclude`] set says which are dropped, per nesting level.
//! Missing values fall back to safe defaults so the output never leaks an
//! internal message by accident.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::add_at;
use crate::types::{Additional, ErrorRecord, ErrorRef, DEFAULT_MESSAGE, DEFAULT_STATUS, UNKNOWN_NAME};
use crate::value::from_value;

const DEFAULT_MAP: &[(&str, &str)] = &[
    ("client_safe_message", "message"),
    ("errors.client_safe_message", "errors"),
    ("field", "field"),
    ("fields.client_safe_message", "fields"),
    ("name", "name"),
    ("status_code", "status_code"),
];

const ALL_MAP: &[(&str, &str)] = &[
    ("client_safe_message", "client_safe_message"),
    ("errors", "errors"),
    ("field", "field"),
    ("fields", "fields"),
    ("from", "from"),
    ("message", "message"),
    ("name", "name"),
    ("stack", "stack"),
    ("status_code", "status_code"),
];

// ─── Projection ───────────────────────────────────────────────────────────────

/// Which record fields to emit, and under which output keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Client-safe view: the client-safe message under `message`, list and
    /// field errors reduced to their client-safe messages.
    #[default]
    Default,
    /// Everything except the `additional` payload.
    All,
    /// Ordered `source path → output key` pairs. A source may reach one level
    /// into a nested record (`"from.message"`) or into the payload
    /// (`"additional.user_id"`).
    Custom(IndexMap<String, String>),
}

impl Projection {
    /// Build a custom projection from `(source, key)` pairs.
    pub fn custom<I, S, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, K)>,
        S: Into<String>,
        K: Into<String>,
    {
        Self::Custom(
            pairs
                .into_iter()
                .map(|(source, key)| (source.into(), key.into()))
                .collect(),
        )
    }

    fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Default => DEFAULT_MAP.to_vec(),
            Self::All => ALL_MAP.to_vec(),
            Self::Custom(map) => map.iter().map(|(s, k)| (s.as_str(), k.as_str())).collect(),
        }
    }
}

// ─── Exclusion ────────────────────────────────────────────────────────────────

/// Fields to drop, keyed by source field name.
///
/// `true` drops the field at this level. A nested set replaces the built-in
/// default for the records found under that key.
///
/// ```json
/// { "stack": true, "from": { "status_code": true, "name": true } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exclude(BTreeMap<String, Exclusion>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exclusion {
    Flag(bool),
    Nested(Exclude),
}

impl Exclude {
    pub fn new() -> Self {
        Self::default()
    }

    /// An exclusion set dropping each of `keys`.
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self(
            keys.into_iter()
                .map(|key| (key.into(), Exclusion::Flag(true)))
                .collect(),
        )
    }

    /// Drop `key` at this level.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), Exclusion::Flag(true));
        self
    }

    /// Use `nested` for the records under `key`.
    pub fn nested(mut self, key: impl Into<String>, nested: Exclude) -> Self {
        self.0.insert(key.into(), Exclusion::Nested(nested));
        self
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Exclusion::Flag(true)))
    }

    /// `self` with every entry of `overlay` written over it.
    pub fn merged(&self, overlay: &Exclude) -> Exclude {
        let mut out = self.clone();
        for (key, value) in &overlay.0 {
            out.0.insert(key.clone(), value.clone());
        }
        out
    }

    /// Exclusion set for the records found under `key`.
    fn for_child(&self, key: &str) -> Exclude {
        match self.0.get(key) {
            Some(Exclusion::Nested(overlay)) => self.merged(overlay),
            _ => self.merged(&default_child_exclusion(key)),
        }
    }
}

fn default_child_exclusion(key: &str) -> Exclude {
    match key {
        "fields" => Exclude::keys(["fields", "status_code"]),
        _ => Exclude::keys(["fields", "errors", "status_code"]),
    }
}

// ─── Projection entry points ──────────────────────────────────────────────────

/// Client-safe projection with the default map and no exclusions.
pub fn to_client(err: &ErrorRef) -> Value {
    project(err, &Projection::Default, &Exclude::default())
}

/// Project `err` through `projection`, dropping what `exclude` names.
pub fn project(err: &ErrorRef, projection: &Projection, exclude: &Exclude) -> Value {
    let entries = projection.entries();
    let mut path = Vec::new();
    Value::Object(project_node(err, &entries, exclude, &mut path))
}

/// Project a sequence: the first error is primary and the rest are added to
/// it as unnamed errors, so the first error's tree is modified. An empty
/// sequence projects like an empty record.
pub fn project_all(errors: &[ErrorRef], projection: &Projection, exclude: &Exclude) -> Value {
    match errors.split_first() {
        Some((first, rest)) => {
            let primary = rest
                .iter()
                .fold(first.clone(), |base, err| add_at(&base, None, err));
            project(&primary, projection, exclude)
        }
        None => project(&ErrorRecord::default().into_ref(), projection, exclude),
    }
}

/// Project any JSON value; see [`from_value`] for how it is read.
pub fn project_value(value: &Value, projection: &Projection, exclude: &Exclude) -> Value {
    match value {
        Value::Array(items) => {
            let errors: Vec<ErrorRef> = items.iter().map(from_value).collect();
            project_all(&errors, projection, exclude)
        }
        other => project(&from_value(other), projection, exclude),
    }
}

fn project_node(
    err: &ErrorRef,
    entries: &[(&str, &str)],
    exclude: &Exclude,
    path: &mut Vec<usize>,
) -> Map<String, Value> {
    let record = err.read().clone();

    // Already being projected further up: scalars only.
    let id = err.id();
    let descend = !path.contains(&id);
    if descend {
        path.push(id);
    }

    let mut out = Map::new();
    for &(source, key) in entries {
        let (top, sub) = match source.split_once('.') {
            Some((top, sub)) => (top, Some(sub)),
            None => (source, None),
        };
        if exclude.is_excluded(top) {
            continue;
        }

        let value = match top {
            "from" | "errors" | "fields" if !descend => None,
            "from" => record.from.as_ref().and_then(|cause| {
                let child = exclude.for_child("from");
                project_child(cause, sub, entries, &child, path)
            }),
            "errors" if record.errors.is_empty() => None,
            "errors" => {
                let child = exclude.for_child("errors");
                let items = record
                    .errors
                    .iter()
                    .map(|e| project_child(e, sub, entries, &child, path).unwrap_or(Value::Null))
                    .collect();
                Some(Value::Array(items))
            }
            "fields" => record.fields.as_ref().map(|fields| {
                let child = exclude.for_child("fields");
                let projected = fields
                    .iter()
                    .filter_map(|(name, e)| {
                        project_child(e, sub, entries, &child, path).map(|v| (name.clone(), v))
                    })
                    .collect();
                Value::Object(projected)
            }),
            _ => scalar(&record, top, sub),
        };

        if let Some(value) = value {
            out.insert(key.to_string(), value);
        }
    }

    if descend {
        path.pop();
    }
    out
}

/// A nested record: the whole map, or just `sub` pulled out of it.
fn project_child(
    err: &ErrorRef,
    sub: Option<&str>,
    entries: &[(&str, &str)],
    exclude: &Exclude,
    path: &mut Vec<usize>,
) -> Option<Value> {
    match sub {
        Some(sub) => project_node(err, &[(sub, sub)], exclude, path).remove(sub),
        None => Some(Value::Object(project_node(err, entries, exclude, path))),
    }
}

fn scalar(record: &ErrorRecord, top: &str, sub: Option<&str>) -> Option<Value> {
    if top == "additional" {
        let payload = record.additional.as_ref().and_then(Additional::as_json)?;
        return match sub {
            Some(sub) => sub
                .split('.')
                .try_fold(payload, |node, key| node.get(key))
                .cloned(),
            None => Some(payload.clone()),
        };
    }
    if sub.is_some() {
        return None;
    }

    match top {
        "message" => Some(match (&record.message, &record.raw) {
            (Some(message), _) => message.as_str().into(),
            // A bare scalar coerced into a record is its own message.
            (None, Some(raw @ (Value::Bool(_) | Value::Number(_) | Value::String(_)))) => raw.clone(),
            (None, _) => DEFAULT_MESSAGE.into(),
        }),
        "client_safe_message" => Some(
            record
                .client_safe_message
                .as_deref()
                .unwrap_or(DEFAULT_MESSAGE)
                .into(),
        ),
        "name" => Some(record.name.as_deref().unwrap_or(UNKNOWN_NAME).into()),
        "status_code" => Some(record.status_code.unwrap_or(DEFAULT_STATUS).into()),
        "stack" => Some(record.headline().into()),
        "field" => record.field.clone().map(Value::from),
        "generic" => record.generic.then_some(Value::Bool(true)),
        _ => None,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
