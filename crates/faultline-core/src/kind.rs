//! Error kinds: named defaults records are constructed from.
//!
//! A kind may extend another one; omitted defaults are inherited and
//! [`ErrorKind::is_a`] walks the parent chain.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::StackCapture;
use crate::error::RegistryError;
use crate::types::{Additional, ErrorRecord, ErrorRef, DEFAULT_MESSAGE, DEFAULT_STATUS};

// ─── KindSpec ─────────────────────────────────────────────────────────────────

/// Declaration of a kind, as written in code or in a kinds JSON file.
///
/// ```json
/// { "name": "UserError", "message": "Please check your input.", "status_code": 400, "client_safe": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindSpec {
    pub name: String,
    /// Default message. Empty means "inherit or use the global default".
    #[serde(default)]
    pub message: Option<String>,
    /// Default status code. Zero means "inherit or use 500".
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Whether instance messages may be shown to clients.
    #[serde(default)]
    pub client_safe: Option<bool>,
    /// Name of the parent kind.
    #[serde(default)]
    pub extends: Option<String>,
}

impl KindSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn client_safe(mut self, client_safe: bool) -> Self {
        self.client_safe = Some(client_safe);
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }
}

// ─── ErrorKind ────────────────────────────────────────────────────────────────

/// A declared error kind.
pub struct ErrorKind {
    name: String,
    message: String,
    status_code: u16,
    client_safe: bool,
    parent: Option<Arc<ErrorKind>>,
    capture: Option<Arc<dyn StackCapture>>,
}

impl ErrorKind {
    /// Declare a root kind with no capture hook.
    pub fn new(spec: KindSpec) -> Result<Arc<Self>, RegistryError> {
        Self::declare(spec, None, None)
    }

    /// Declare `spec` under an optional parent, resolving inherited defaults.
    pub(crate) fn declare(
        spec: KindSpec,
        parent: Option<Arc<ErrorKind>>,
        capture: Option<Arc<dyn StackCapture>>,
    ) -> Result<Arc<Self>, RegistryError> {
        if spec.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }

        let message = spec
            .message
            .filter(|m| !m.is_empty())
            .or_else(|| parent.as_ref().map(|p| p.message.clone()))
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        let status_code = spec
            .status_code
            .filter(|code| *code != 0)
            .or_else(|| parent.as_ref().map(|p| p.status_code))
            .unwrap_or(DEFAULT_STATUS);
        let client_safe = spec
            .client_safe
            .or_else(|| parent.as_ref().map(|p| p.client_safe))
            .unwrap_or(false);
        let capture = capture.or_else(|| parent.as_ref().and_then(|p| p.capture.clone()));

        Ok(Arc::new(Self {
            name: spec.name,
            message,
            status_code,
            client_safe,
            parent,
            capture,
        }))
    }

    /// Derive a child kind inheriting this kind's defaults and capture hook.
    ///
    /// `spec.extends` is ignored; the parent is `self`.
    pub fn extend(self: &Arc<Self>, spec: KindSpec) -> Result<Arc<Self>, RegistryError> {
        Self::declare(spec, Some(Arc::clone(self)), None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default message for instances.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn client_safe(&self) -> bool {
        self.client_safe
    }

    pub fn parent(&self) -> Option<&Arc<ErrorKind>> {
        self.parent.as_ref()
    }

    /// `true` if `self` is `other` or derives from it.
    pub fn is_a(&self, other: &ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if std::ptr::eq(kind, other) {
                return true;
            }
            current = kind.parent.as_deref();
        }
        false
    }

    /// Construct a record of this kind.
    pub fn instantiate(self: &Arc<Self>, init: Init) -> ErrorRef {
        let Init {
            message,
            additional,
            third,
            mut field,
        } = init;

        let mut from = None;
        match third {
            Some(CauseOrField::Cause(cause)) => from = Some(cause),
            Some(CauseOrField::Field(name)) => field = Some(name),
            None => {}
        }

        let message = message.filter(|m| !m.is_empty());
        let client_safe_message = match &message {
            Some(message) if self.client_safe => message.clone(),
            _ => self.message.clone(),
        };

        let mut record = ErrorRecord {
            name: Some(self.name.clone()),
            message: Some(message.unwrap_or_else(|| self.message.clone())),
            client_safe_message: Some(client_safe_message),
            status_code: Some(self.status_code),
            field: field.filter(|f| !f.is_empty()),
            from,
            additional,
            kind: Some(Arc::clone(self)),
            ..ErrorRecord::default()
        };

        if let Some(capture) = &self.capture {
            record.stack = capture.capture(&record, self);
            tracing::trace!(kind = %self.name, hook = capture.label(), "captured stack");
        }

        ErrorRef::new(record)
    }

    /// Start building a record of this kind.
    pub fn build(self: &Arc<Self>, message: impl Into<String>) -> KindBuilder {
        KindBuilder {
            kind: Arc::clone(self),
            init: Init {
                message: Some(message.into()),
                ..Init::default()
            },
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorKind")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("status_code", &self.status_code)
            .field("client_safe", &self.client_safe)
            .field("parent", &self.parent.as_ref().map(|p| p.name.as_str()))
            .field("capture", &self.capture.as_ref().map(|c| c.label()))
            .finish()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.status_code, self.message)?;
        if self.client_safe {
            write!(f, " [client-safe]")?;
        }
        if let Some(parent) = &self.parent {
            write!(f, " extends {}", parent.name)?;
        }
        Ok(())
    }
}

// ─── Construction ─────────────────────────────────────────────────────────────

/// The third construction argument: either a wrapped cause or a field name.
#[derive(Debug, Clone)]
pub enum CauseOrField {
    Cause(ErrorRef),
    Field(String),
}

impl From<ErrorRef> for CauseOrField {
    fn from(cause: ErrorRef) -> Self {
        Self::Cause(cause)
    }
}

impl From<&str> for CauseOrField {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl From<String> for CauseOrField {
    fn from(field: String) -> Self {
        Self::Field(field)
    }
}

/// Arguments for [`ErrorKind::instantiate`].
///
/// A `Field` in `third` takes precedence over `field`.
#[derive(Debug, Clone, Default)]
pub struct Init {
    pub message: Option<String>,
    pub additional: Option<Additional>,
    pub third: Option<CauseOrField>,
    pub field: Option<String>,
}

/// Fluent wrapper over [`Init`].
#[derive(Debug)]
pub struct KindBuilder {
    kind: Arc<ErrorKind>,
    init: Init,
}

impl KindBuilder {
    pub fn additional<T: Serialize + ?Sized>(mut self, payload: &T) -> Self {
        self.init.additional = Some(Additional::from_serialize(payload));
        self
    }

    pub fn cause(mut self, cause: ErrorRef) -> Self {
        self.init.third = Some(CauseOrField::Cause(cause));
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.init.field = Some(field.into());
        self
    }

    pub fn finish(self) -> ErrorRef {
        self.kind.instantiate(self.init)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_kind() -> Arc<ErrorKind> {
        ErrorKind::new(
            KindSpec::new("TestError")
                .message("There was a test error.")
                .status(400)
                .client_safe(true),
        )
        .unwrap()
    }

    #[test]
    fn instantiate_with_all_arguments() {
        let kind = test_kind();
        let cause = ErrorRecord::new("Bad stuff...").into_ref();
        let err = kind.instantiate(Init {
            message: Some("Test...".into()),
            additional: Some(json!({ "sent": "abc" }).into()),
            third: Some(cause.clone().into()),
            field: Some("test".into()),
        });

        assert_eq!(err.message().as_deref(), Some("Test..."));
        assert_eq!(err.client_safe_message().as_deref(), Some("Test..."));
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.name(), "TestError");
        assert_eq!(err.additional(), Some(Additional::Json(json!({ "sent": "abc" }))));
        assert!(err.from().unwrap().ptr_eq(&cause));
        assert_eq!(err.field().as_deref(), Some("test"));
    }

    #[test]
    fn third_argument_string_is_a_field() {
        let err = test_kind().instantiate(Init {
            message: Some("Test4...".into()),
            third: Some("test".into()),
            ..Init::default()
        });
        assert!(err.from().is_none());
        assert!(err.additional().is_none());
        assert_eq!(err.field().as_deref(), Some("test"));
    }

    #[test]
    fn defaults_without_declared_values() {
        let kind = ErrorKind::new(KindSpec::new("TestError")).unwrap();
        assert!(!kind.client_safe());

        let err = kind.instantiate(Init::default());
        assert_eq!(err.message().as_deref(), Some("There was an error."));
        assert_eq!(err.client_safe_message().as_deref(), Some("There was an error."));
        assert_eq!(err.status_code(), 500);
        assert!(err.field().is_none());
    }

    #[test]
    fn unsafe_kind_keeps_default_client_message() {
        let kind = ErrorKind::new(KindSpec::new("DevError").message("Bad setup on server.")).unwrap();
        let err = kind.build("dev message").finish();
        assert_eq!(err.message().as_deref(), Some("dev message"));
        assert_eq!(err.client_safe_message().as_deref(), Some("Bad setup on server."));
    }

    #[test]
    fn extended_kind_overrides_defaults() {
        let parent = test_kind();
        let child = parent
            .extend(
                KindSpec::new("TestError2")
                    .message("There was a test error 2...")
                    .status(401)
                    .client_safe(false),
            )
            .unwrap();

        assert!(parent.client_safe());
        assert!(!child.client_safe());

        let err = child.instantiate(Init::default());
        assert!(err.is_kind(&child));
        assert!(err.is_kind(&parent));
        assert_eq!(err.message().as_deref(), Some("There was a test error 2..."));
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.name(), "TestError2");
    }

    #[test]
    fn extended_kind_inherits_defaults() {
        let parent = test_kind();
        let child = parent.extend(KindSpec::new("TestError2")).unwrap();
        assert!(child.client_safe());

        let err = child.instantiate(Init::default());
        assert_eq!(err.message().as_deref(), Some("There was a test error."));
        assert_eq!(err.status_code(), 400);
        assert!(!err.is_kind(&ErrorKind::new(KindSpec::new("TestError")).unwrap()));
    }

    #[test]
    fn capture_hook_populates_stack() {
        use crate::capture::HeadlineCapture;
        let kind = ErrorKind::declare(KindSpec::new("TestError"), None, Some(Arc::new(HeadlineCapture)))
            .unwrap();
        let err = kind.build("Test...").finish();
        assert_eq!(err.stack_trace().as_deref(), Some("TestError: Test..."));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(ErrorKind::new(KindSpec::new("")), Err(RegistryError::EmptyName)));
    }
}
