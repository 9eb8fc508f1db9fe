//! Mount registry.
//!
//! # Responsibilities
//! - Store mount entries in registration order
//! - Look up the first mount whose prefix covers a request path
//! - Return the matched mount or an explicit no-match
//!
//! # Design Decisions
//! - Populated once at startup, then shared behind `Arc` (no locks on lookup)
//! - First match wins; entries are never reordered by prefix length
//! - O(n) prefix scan (acceptable for typical mount counts)

use std::sync::Arc;

use crate::hosting::{Pipeline, ScopeFactory};
use crate::routing::matcher::{MountError, PathPrefix};

/// One mounted application: a prefix bound to a pipeline and its scope factory.
pub struct MountEntry {
    name: String,
    prefix: PathPrefix,
    pipeline: Arc<dyn Pipeline>,
    scope_factory: Arc<dyn ScopeFactory>,
}

impl MountEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &PathPrefix {
        &self.prefix
    }

    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn scope_factory(&self) -> &Arc<dyn ScopeFactory> {
        &self.scope_factory
    }
}

impl std::fmt::Debug for MountEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountEntry")
            .field("name", &self.name)
            .field("prefix", &self.prefix.as_str())
            .finish_non_exhaustive()
    }
}

/// Ordered collection of mounts.
#[derive(Debug, Default)]
pub struct MountRegistry {
    entries: Vec<Arc<MountEntry>>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount. Malformed prefixes fail here, never at request time.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        prefix: &str,
        pipeline: Arc<dyn Pipeline>,
        scope_factory: Arc<dyn ScopeFactory>,
    ) -> Result<Arc<MountEntry>, MountError> {
        let name = name.into();
        let prefix = PathPrefix::parse(prefix)?;

        if self.entries.iter().any(|e| e.name == name) {
            return Err(MountError::DuplicateName(name));
        }

        if let Some(shadow) = self.find(prefix.as_str()) {
            tracing::warn!(
                mount = %name,
                prefix = %prefix,
                shadowed_by = %shadow.name,
                "Mount prefix is covered by an earlier mount"
            );
        }

        let entry = Arc::new(MountEntry {
            name,
            prefix,
            pipeline,
            scope_factory,
        });

        tracing::info!(mount = %entry.name, prefix = %entry.prefix, "Mount registered");
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Find the first mount (in registration order) covering `path`.
    pub fn find(&self, path: &str) -> Option<&Arc<MountEntry>> {
        self.entries.iter().find(|e| e.prefix.matches(path))
    }

    pub fn entries(&self) -> &[Arc<MountEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
