//! Kind registry: declared error kinds, looked up by name.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

use crate::capture::StackCapture;
use crate::error::RegistryError;
use crate::kind::{ErrorKind, KindSpec};

/// Trait for looking up declared kinds.
pub trait KindRegistry: Send + Sync {
    /// Look up a kind by name.
    fn get(&self, name: &str) -> Option<Arc<ErrorKind>>;

    /// Names of all declared kinds, in declaration order.
    fn names(&self) -> Vec<String>;

    /// Total number of declared kinds.
    fn len(&self) -> usize;

    /// Returns `true` if no kind is declared.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── In-memory registry ───────────────────────────────────────────────────────

/// A simple in-memory registry backed by an insertion-ordered map.
pub struct MemoryKindRegistry {
    kinds: RwLock<IndexMap<String, Arc<ErrorKind>>>,
    capture: Option<Arc<dyn StackCapture>>,
}

impl MemoryKindRegistry {
    /// Create an empty registry without a capture hook.
    pub fn new() -> Self {
        Self {
            kinds: RwLock::new(IndexMap::new()),
            capture: None,
        }
    }

    /// Create an empty registry whose kinds capture a stack on construction.
    pub fn with_capture(capture: Arc<dyn StackCapture>) -> Self {
        Self {
            kinds: RwLock::new(IndexMap::new()),
            capture: Some(capture),
        }
    }

    /// The hook handed to every kind this registry declares.
    pub fn capture(&self) -> Option<&Arc<dyn StackCapture>> {
        self.capture.as_ref()
    }

    /// Declare a kind. `spec.extends` must name an already declared kind.
    pub fn declare(&self, spec: KindSpec) -> Result<Arc<ErrorKind>, RegistryError> {
        let mut kinds = self.kinds.write().unwrap_or_else(PoisonError::into_inner);
        if kinds.contains_key(&spec.name) {
            return Err(RegistryError::Duplicate { name: spec.name });
        }

        let parent = match &spec.extends {
            Some(parent) => Some(kinds.get(parent).cloned().ok_or_else(|| {
                RegistryError::UnknownParent {
                    name: spec.name.clone(),
                    parent: parent.clone(),
                }
            })?),
            None => None,
        };

        let kind = ErrorKind::declare(spec, parent, self.capture.clone())?;
        tracing::debug!(
            kind = kind.name(),
            status = kind.status_code(),
            parent = kind.parent().map(|p| p.name()),
            "declared error kind"
        );
        kinds.insert(kind.name().to_string(), Arc::clone(&kind));
        Ok(kind)
    }

    /// Load kinds from a JSON array string.
    /// Expected format: `[{ "name": "...", "message": "...", "status_code": 400, ... }, ...]`
    ///
    /// Entries are declared in order, so a kind may extend any kind listed
    /// before it. Returns the number declared.
    pub fn load_json(&self, json: &str) -> Result<usize, RegistryError> {
        let specs: Vec<KindSpec> = serde_json::from_str(json)?;
        let count = specs.len();
        for spec in specs {
            self.declare(spec)?;
        }
        Ok(count)
    }
}

impl Default for MemoryKindRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KindRegistry for MemoryKindRegistry {
    fn get(&self, name: &str) -> Option<Arc<ErrorKind>> {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn names(&self) -> Vec<String> {
        self.kinds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.kinds.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
