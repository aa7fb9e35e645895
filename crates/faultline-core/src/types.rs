//! Core types for the faultline error model.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::kind::ErrorKind;

/// Message used whenever a record has none to offer.
pub const DEFAULT_MESSAGE: &str = "There was an error.";

/// Name used whenever a record has no kind discriminator.
pub const UNKNOWN_NAME: &str = "UnknownError";

/// Status code used whenever a record does not suggest one.
pub const DEFAULT_STATUS: u16 = 500;

/// Named sub-errors keyed by dotted path, in insertion order.
pub type FieldErrors = IndexMap<String, ErrorRef>;

// ─── Additional ───────────────────────────────────────────────────────────────

/// Free-form payload attached to a record.
///
/// The payload is converted to JSON once, when it is attached. A payload that
/// cannot be represented keeps the serializer's failure text so the stack
/// renderer can report it instead of the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    /// The payload as JSON.
    Json(Value),
    /// The payload failed to serialize; holds the serializer's message.
    Unserializable(String),
}

impl Additional {
    /// Serialize any payload, capturing failures instead of returning them.
    pub fn from_serialize<T: Serialize + ?Sized>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => Self::Json(value),
            Err(e) => {
                tracing::debug!(error = %e, "additional payload is not serializable");
                Self::Unserializable(e.to_string())
            }
        }
    }

    /// The JSON form of the payload, if it serialized.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Unserializable(_) => None,
        }
    }
}

impl From<Value> for Additional {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

// ─── ErrorRecord ──────────────────────────────────────────────────────────────

/// The universal error shape every algorithm in this crate operates on.
///
/// Everything except `errors` is optional. Readers substitute
/// [`UNKNOWN_NAME`], [`DEFAULT_MESSAGE`] and [`DEFAULT_STATUS`] for missing
/// values; the record itself keeps track of what was actually set.
#[derive(Debug, Clone, Default)]
pub struct ErrorRecord {
    /// Kind discriminator (e.g. `"UserError"`).
    pub name: Option<String>,
    /// Internal, human-readable description.
    pub message: Option<String>,
    /// Message that may cross a trust boundary.
    pub client_safe_message: Option<String>,
    /// Suggested transport status.
    pub status_code: Option<u16>,
    /// Field this record attaches under when added without an explicit one.
    pub field: Option<String>,
    /// Placeholder to be replaced by a more specific error on merge.
    pub generic: bool,
    /// Trace captured when the record was constructed.
    pub stack: Option<String>,
    /// Unnamed sibling errors, oldest first.
    pub errors: Vec<ErrorRef>,
    /// Named sub-errors. `None` and an empty map are distinct: only the
    /// latter is projected (as `{}`).
    pub fields: Option<FieldErrors>,
    /// Wrapped upstream cause.
    pub from: Option<ErrorRef>,
    /// Caller-supplied payload.
    pub additional: Option<Additional>,
    /// Kind the record was constructed from.
    pub kind: Option<Arc<ErrorKind>>,
    /// Original value of a record coerced from arbitrary JSON without a
    /// `message`; used to describe it.
    pub raw: Option<Value>,
}

impl ErrorRecord {
    /// A record carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_client_safe_message(mut self, message: impl Into<String>) -> Self {
        self.client_safe_message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_from(mut self, cause: ErrorRef) -> Self {
        self.from = Some(cause);
        self
    }

    /// Attach a payload; see [`Additional::from_serialize`].
    pub fn with_additional<T: Serialize + ?Sized>(mut self, payload: &T) -> Self {
        self.additional = Some(Additional::from_serialize(payload));
        self
    }

    /// Attach an explicitly empty field map.
    pub fn with_empty_fields(mut self) -> Self {
        self.fields.get_or_insert_with(IndexMap::new);
        self
    }

    /// Mark the record as a generic placeholder.
    pub fn generic(mut self) -> Self {
        self.generic = true;
        self
    }

    /// Wrap the record in a shared handle.
    pub fn into_ref(self) -> ErrorRef {
        ErrorRef::new(self)
    }

    /// The one-line headline: the captured stack if any, else `name: message`.
    pub fn headline(&self) -> String {
        if let Some(stack) = &self.stack {
            return stack.clone();
        }
        let name = self.name.as_deref().unwrap_or(UNKNOWN_NAME);
        match &self.message {
            Some(message) => format!("{name}: {message}"),
            None => format!("{name}: {}.", self.describe()),
        }
    }

    /// Best-effort text for a record without a message.
    fn describe(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.to_string();
        }
        let mut summary = Map::new();
        if let Some(name) = &self.name {
            summary.insert("name".into(), name.clone().into());
        }
        if let Some(message) = &self.client_safe_message {
            summary.insert("client_safe_message".into(), message.clone().into());
        }
        if let Some(code) = self.status_code {
            summary.insert("status_code".into(), code.into());
        }
        if let Some(field) = &self.field {
            summary.insert("field".into(), field.clone().into());
        }
        if self.generic {
            summary.insert("generic".into(), true.into());
        }
        Value::Object(summary).to_string()
    }

    /// Field errors in insertion order; empty when there is no field map.
    pub fn field_errors(&self) -> impl Iterator<Item = (&String, &ErrorRef)> {
        self.fields.iter().flat_map(|fields| fields.iter())
    }
}

// ─── ErrorRef ─────────────────────────────────────────────────────────────────

/// Shared, mutable handle to an [`ErrorRecord`].
///
/// Identity matters: the aggregator de-duplicates and refuses self-attachment
/// by reference, never by value. Clone the handle to share a record between
/// trees.
#[derive(Clone)]
pub struct ErrorRef(Arc<RwLock<ErrorRecord>>);

impl ErrorRef {
    pub fn new(record: ErrorRecord) -> Self {
        Self(Arc::new(RwLock::new(record)))
    }

    /// `true` if both handles point at the same record.
    pub fn ptr_eq(&self, other: &ErrorRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared record, used to detect cycles.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Read access. A poisoned lock is recovered: records only ever grow, so
    /// a panicking writer cannot leave one half-built in a harmful way.
    pub fn read(&self) -> RwLockReadGuard<'_, ErrorRecord> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access; see [`ErrorRef::read`].
    pub fn write(&self) -> RwLockWriteGuard<'_, ErrorRecord> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name, defaulting to [`UNKNOWN_NAME`].
    pub fn name(&self) -> String {
        self.read()
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    }

    pub fn message(&self) -> Option<String> {
        self.read().message.clone()
    }

    pub fn client_safe_message(&self) -> Option<String> {
        self.read().client_safe_message.clone()
    }

    /// Status code, defaulting to [`DEFAULT_STATUS`].
    pub fn status_code(&self) -> u16 {
        self.read().status_code.unwrap_or(DEFAULT_STATUS)
    }

    pub fn field(&self) -> Option<String> {
        self.read().field.clone()
    }

    pub fn is_generic(&self) -> bool {
        self.read().generic
    }

    /// Toggle the generic flag in place.
    pub fn set_generic(&self, generic: bool) -> &Self {
        self.write().generic = generic;
        self
    }

    /// Snapshot of the unnamed errors.
    pub fn errors(&self) -> Vec<ErrorRef> {
        self.read().errors.clone()
    }

    /// Snapshot of the field errors, in insertion order.
    pub fn fields(&self) -> Vec<(String, ErrorRef)> {
        self.read()
            .field_errors()
            .map(|(name, err)| (name.clone(), err.clone()))
            .collect()
    }

    /// `true` if the record carries a field map, even an empty one.
    pub fn has_fields(&self) -> bool {
        self.read().fields.is_some()
    }

    /// The field error stored under `path`.
    pub fn field_error(&self, path: &str) -> Option<ErrorRef> {
        self.read()
            .fields
            .as_ref()
            .and_then(|fields| fields.get(path).cloned())
    }

    pub fn from(&self) -> Option<ErrorRef> {
        self.read().from.clone()
    }

    pub fn additional(&self) -> Option<Additional> {
        self.read().additional.clone()
    }

    pub fn stack_trace(&self) -> Option<String> {
        self.read().stack.clone()
    }

    /// `true` if the record was built from `kind` or from a kind derived from it.
    pub fn is_kind(&self, kind: &ErrorKind) -> bool {
        self.read()
            .kind
            .as_ref()
            .map_or(false, |own| own.is_a(kind))
    }

    /// Render the full diagnostic stack of the tree as it is right now.
    pub fn stack(&self) -> String {
        crate::stack::render(self)
    }

    /// Client-safe JSON projection with the default map.
    pub fn to_json(&self) -> Value {
        crate::json::to_client(self)
    }
}

impl From<ErrorRecord> for ErrorRef {
    fn from(record: ErrorRecord) -> Self {
        Self::new(record)
    }
}

impl fmt::Display for ErrorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.read();
        let name = record.name.as_deref().unwrap_or(UNKNOWN_NAME);
        match record.message.as_deref() {
            Some(message) if !message.is_empty() => write!(f, "{name}: {message}"),
            _ => write!(f, "{name}"),
        }
    }
}

impl fmt::Debug for ErrorRef {
    // Shallow on purpose: trees may contain cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = match self.0.try_read() {
            Ok(record) => record,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return f.write_str("ErrorRef(<locked>)"),
        };
        let fields: Vec<&String> = record.field_errors().map(|(name, _)| name).collect();
        f.debug_struct("ErrorRef")
            .field("name", &record.name)
            .field("message", &record.message)
            .field("generic", &record.generic)
            .field("errors", &record.errors.len())
            .field("fields", &fields)
            .field("from", &record.from.is_some())
            .finish()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
