//! Engine identifier → implementation lookup.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::{Builtin, Transform};

pub struct Registry {
    engines: FxHashMap<String, Arc<dyn Transform>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            engines: FxHashMap::default(),
        }
    }

    /// Registry with every built-in engine.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for builtin in Builtin::ALL {
            registry.register(builtin.id(), builtin.engine());
        }
        registry
    }

    /// Add or replace an engine.
    pub fn register(&mut self, id: impl Into<String>, engine: Arc<dyn Transform>) {
        self.engines.insert(id.into(), engine);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Transform>> {
        self.engines.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.engines.contains_key(id)
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.engines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("engines", &self.ids()).finish()
    }
}
