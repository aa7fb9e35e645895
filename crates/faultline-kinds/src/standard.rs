//! `StandardKinds`: a registry pre-populated with the common HTTP-facing kinds.
//!
//! | Kind               | Status | Client-safe | Default message               |
//! |--------------------|--------|-------------|-------------------------------|
//! | `AuthError`        | 401    | yes         | Authorization required.       |
//! | `DevError`         | 500    | no          | Bad setup on server.          |
//! | `HTTPRequestError` | 500    | no          | Bad response from server.     |
//! | `NotFoundError`    | 404    | yes         | Not found.                    |
//! | `NotifyUser`       | 500    | yes         | A server error occurred.      |
//! | `ServiceError`     | 500    | yes         | Error from service providor.  |
//! | `UserError`        | 400    | yes         | Please check your input.      |

use std::sync::Arc;

use faultline_core::{
    ErrorKind, KindBuilder, KindRegistry, KindSpec, MemoryKindRegistry, RegistryError, StackCapture,
};

/// `(name, message, status, client_safe)`
const BUNDLED: &[(&str, &str, u16, bool)] = &[
    ("AuthError", "Authorization required.", 401, true),
    ("DevError", "Bad setup on server.", 500, false),
    ("HTTPRequestError", "Bad response from server.", 500, false),
    ("NotFoundError", "Not found.", 404, true),
    ("NotifyUser", "A server error occurred.", 500, true),
    ("ServiceError", "Error from service providor.", 500, true),
    ("UserError", "Please check your input.", 400, true),
];

/// Registry holding the bundled kinds plus anything declared afterwards.
///
/// # Usage
/// ```rust
/// use faultline_kinds::StandardKinds;
///
/// let kinds = StandardKinds::new();
/// let err = kinds.build("UserError", "Email is required.").unwrap().field("email").finish();
/// assert_eq!(err.status_code(), 400);
/// assert_eq!(err.to_json()["message"], "Email is required.");
/// ```
pub struct StandardKinds {
    registry: Arc<MemoryKindRegistry>,
}

impl StandardKinds {
    /// Bundled kinds, capturing a backtrace on construction when the
    /// `backtrace` feature is on.
    pub fn new() -> Self {
        #[cfg(feature = "backtrace")]
        let reg = MemoryKindRegistry::with_capture(Arc::new(crate::capture::BacktraceCapture));
        #[cfg(not(feature = "backtrace"))]
        let reg = MemoryKindRegistry::new();
        Self::from_registry(reg)
    }

    /// Bundled kinds using `capture` as the stack hook.
    pub fn with_capture(capture: Arc<dyn StackCapture>) -> Self {
        Self::from_registry(MemoryKindRegistry::with_capture(capture))
    }

    /// Bundled kinds without any stack capture.
    pub fn without_capture() -> Self {
        Self::from_registry(MemoryKindRegistry::new())
    }

    fn from_registry(reg: MemoryKindRegistry) -> Self {
        if let Err(e) = declare_bundled(&reg) {
            // Only reachable if the registry already held one of the names.
            tracing::warn!(error = %e, "bundled kinds not fully declared");
        }
        Self {
            registry: Arc::new(reg),
        }
    }

    /// The underlying registry; declare or load more kinds through it.
    pub fn registry(&self) -> &Arc<MemoryKindRegistry> {
        &self.registry
    }

    /// `true` if records built from these kinds get a captured stack.
    pub fn captures_stacks(&self) -> bool {
        self.registry.capture().is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ErrorKind>> {
        self.registry.get(name)
    }

    /// Declare an additional kind; `spec.extends` may name a bundled kind.
    pub fn declare(&self, spec: KindSpec) -> Result<Arc<ErrorKind>, RegistryError> {
        self.registry.declare(spec)
    }

    /// Load additional kinds from a JSON array.
    pub fn load_json(&self, json: &str) -> Result<usize, RegistryError> {
        self.registry.load_json(json)
    }

    /// Start building a record of kind `name`, if declared.
    pub fn build(&self, name: &str, message: impl Into<String>) -> Option<KindBuilder> {
        self.get(name).map(|kind| kind.build(message))
    }
}

impl Default for StandardKinds {
    fn default() -> Self {
        Self::new()
    }
}

/// Declare the bundled kinds into `reg`.
pub fn declare_bundled(reg: &MemoryKindRegistry) -> Result<(), RegistryError> {
    for &(name, message, status, client_safe) in BUNDLED {
        reg.declare(
            KindSpec::new(name)
                .message(message)
                .status(status)
                .client_safe(client_safe),
        )?;
    }
    tracing::debug!(count = BUNDLED.len(), "declared bundled kinds");
    Ok(())
}
