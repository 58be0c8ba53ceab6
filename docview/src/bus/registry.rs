//! Explicit name → factory registries.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Factory building an `O` from a construction context `C`.
pub type Factory<C, O> = Arc<dyn Fn(&C) -> O + Send + Sync>;

/// Registry of named factories, populated at build time.
///
/// Used for components (`C` = session scope) and layouts (`C` = layout
/// context). Lookup is a single typed `resolve`.
pub struct Registry<C, O> {
    factories: HashMap<String, Factory<C, O>>,
}

impl<C, O> Registry<C, O> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&C) -> O + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn resolve(&self, name: &str) -> Option<Factory<C, O>> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<C, O> Default for Registry<C, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, O> Clone for Registry<C, O> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<C, O> fmt::Debug for Registry<C, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
