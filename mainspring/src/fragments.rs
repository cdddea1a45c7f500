//! Registry of named, reusable configuration fragments.
//!
//! Fragments ("nicknames") are whole subtrees registered under a short name
//! and recalled from interpolations via the `ref` resolver function. The
//! registry is an explicit, process-scoped object; tests construct fresh
//! isolated instances instead of sharing global state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::MainspringError;
use crate::node::ConfigNode;
use crate::MainspringResult;

/// Named-fragment registry: `register` once at startup, `lookup` thereafter.
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    entries: RwLock<HashMap<String, ConfigNode>>,
}

impl FragmentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MainspringError::InvalidInput`] if the name is taken.
    pub fn register(&self, name: impl Into<String>, node: ConfigNode) -> MainspringResult<()> {
        let name = name.into();
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&name) {
            return Err(Arc::new(MainspringError::invalid_input(format!(
                "fragment `{name}` is already registered"
            ))));
        }
        entries.insert(name, node);
        Ok(())
    }

    /// Look up a fragment by name, returning a copy of the subtree.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ConfigNode> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered fragments, unordered.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
