//! Builtin-module registries.
//!
//! Two tables share one shape: the `jsrt:` table of runtime-native module
//! initializers and the `node:` compatibility registry. An initializer
//! builds the module's exports object against the engine on first load;
//! the loader caches the result under the original specifier string.

use jsrt_engine::{Engine, EngineResult};
use std::collections::HashMap;
use std::rc::Rc;

/// Builds a builtin module's exports object.
pub type BuiltinInit<E> = Rc<dyn Fn(&E) -> EngineResult<<E as Engine>::Value>>;

/// Name-to-initializer table for one builtin scheme.
pub struct BuiltinRegistry<E: Engine> {
    scheme: &'static str,
    entries: HashMap<String, BuiltinInit<E>>,
}

impl<E: Engine> BuiltinRegistry<E> {
    pub fn new(scheme: &'static str) -> Self {
        BuiltinRegistry {
            scheme,
            entries: HashMap::new(),
        }
    }

    /// Scheme this registry serves (`jsrt` or `node`).
    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    /// Register an initializer. Later registrations replace earlier ones;
    /// the last wiring wins during embedder setup.
    pub fn register(&mut self, name: impl Into<String>, init: BuiltinInit<E>) {
        self.entries.insert(name.into(), init);
    }

    pub fn get(&self, name: &str) -> Option<&BuiltinInit<E>> {
        self.entries.get(name)
    }

    /// `Module.isBuiltin`-style probe. Accepts both bare and
    /// scheme-prefixed names.
    pub fn contains(&self, name: &str) -> bool {
        let bare = name
            .strip_prefix(self.scheme)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(name);
        self.entries.contains_key(bare)
    }

    /// Sorted list of registered names, for `Module.builtinModules`.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}
