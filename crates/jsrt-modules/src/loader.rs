//! Module loader facade.
//!
//! Single entry point wiring classification, resolution, format
//! detection, protocol dispatch, and the four loaders together.
//! `load(specifier, referrer)` is what `require` and `import` ultimately
//! call; concurrent loads of one specifier cannot happen (loading is
//! synchronous), and repeat loads short-circuit on the cache.

use crate::builtins::{BuiltinInit, BuiltinRegistry};
use crate::cache::{CacheStats, ModuleCache};
use crate::detector::{self, ModuleFormat};
use crate::error::{ModuleError, ModuleResult};
use crate::protocols::ProtocolRegistry;
use crate::resolver::{ResolvedPath, Resolver};
use jsrt_engine::Engine;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::debug;

/// Whether a load came from `import` or `require`; selects the
/// conditional-exports branch during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportContext {
    #[default]
    Esm,
    Cjs,
}

impl ImportContext {
    pub fn is_esm(self) -> bool {
        matches!(self, ImportContext::Esm)
    }
}

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Base directory for referrer-less resolution.
    pub base_dir: String,
    /// Module cache capacity (entries).
    pub cache_capacity: usize,
    /// Enable the babel-types compatibility prologue for known package
    /// shapes. Off by default.
    pub babel_compat: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            base_dir: std::env::current_dir()
                .ok()
                .and_then(|p| p.to_str().map(|s| s.to_string()))
                .unwrap_or_else(|| ".".to_string()),
            cache_capacity: crate::cache::DEFAULT_CAPACITY,
            babel_compat: false,
        }
    }
}

/// Advisory facade counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub loads: u64,
    pub failures: u64,
}

/// The module loader facade. See the crate docs for the data flow.
pub struct ModuleLoader<E: Engine> {
    engine: Rc<E>,
    registry: Arc<ProtocolRegistry>,
    resolver: Resolver,
    options: LoaderOptions,
    /// Self-handle for the host closures (`require`,
    /// `import.meta.resolve`) that re-enter the facade.
    weak: Weak<ModuleLoader<E>>,
    pub(crate) cache: RefCell<ModuleCache<E::Value>>,
    pub(crate) jsrt_builtins: RefCell<BuiltinRegistry<E>>,
    pub(crate) node_builtins: RefCell<BuiltinRegistry<E>>,
    /// Modules currently evaluating, by resolved path; cycle hits read
    /// their partial exports from here.
    pub(crate) in_progress: RefCell<HashMap<String, E::Value>>,
    loads: Cell<u64>,
    failures: Cell<u64>,
}

impl<E: Engine> ModuleLoader<E> {
    pub fn new(engine: Rc<E>, options: LoaderOptions) -> Rc<Self> {
        Self::with_registry(engine, options, Arc::new(ProtocolRegistry::with_defaults()))
    }

    /// Build against an explicit protocol registry (late-registered
    /// transports and tests).
    pub fn with_registry(
        engine: Rc<E>,
        options: LoaderOptions,
        registry: Arc<ProtocolRegistry>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| ModuleLoader {
            engine,
            registry,
            resolver: Resolver::new(options.base_dir.clone()),
            cache: RefCell::new(ModuleCache::with_capacity(options.cache_capacity)),
            jsrt_builtins: RefCell::new(BuiltinRegistry::new("jsrt")),
            node_builtins: RefCell::new(BuiltinRegistry::new("node")),
            in_progress: RefCell::new(HashMap::new()),
            options,
            weak: weak.clone(),
            loads: Cell::new(0),
            failures: Cell::new(0),
        })
    }

    pub(crate) fn weak_handle(&self) -> Weak<ModuleLoader<E>> {
        self.weak.clone()
    }

    pub fn engine(&self) -> &Rc<E> {
        &self.engine
    }

    pub fn protocol_registry(&self) -> &Arc<ProtocolRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Register a `jsrt:` builtin initializer.
    pub fn register_jsrt_builtin(&self, name: impl Into<String>, init: BuiltinInit<E>) {
        self.jsrt_builtins.borrow_mut().register(name, init);
    }

    /// Register a `node:` compatibility module initializer.
    pub fn register_node_builtin(&self, name: impl Into<String>, init: BuiltinInit<E>) {
        self.node_builtins.borrow_mut().register(name, init);
    }

    /// Names available through the node-compat registry.
    pub fn node_builtin_modules(&self) -> Vec<String> {
        self.node_builtins.borrow().names()
    }

    /// `Module.isBuiltin`-style probe over both registries.
    pub fn is_builtin(&self, specifier: &str) -> bool {
        if let Some(name) = specifier.strip_prefix("jsrt:") {
            return self.jsrt_builtins.borrow().contains(name);
        }
        let name = specifier.strip_prefix("node:").unwrap_or(specifier);
        self.node_builtins.borrow().contains(name)
    }

    /// Resolve without loading.
    pub fn resolve(
        &self,
        specifier: &str,
        referrer: Option<&str>,
        context: ImportContext,
    ) -> ModuleResult<ResolvedPath> {
        self.resolver.resolve(specifier, referrer, context.is_esm())
    }

    /// Load a module for an ESM importer.
    pub fn load(&self, specifier: &str, referrer: Option<&str>) -> ModuleResult<E::Value> {
        self.load_with_context(specifier, referrer, ImportContext::Esm)
    }

    /// Load a module with an explicit import context.
    pub fn load_with_context(
        &self,
        specifier: &str,
        referrer: Option<&str>,
        context: ImportContext,
    ) -> ModuleResult<E::Value> {
        self.loads.set(self.loads.get() + 1);
        let result = self.load_inner(specifier, referrer, context);
        if result.is_err() {
            self.failures.set(self.failures.get() + 1);
        }
        result
    }

    fn load_inner(
        &self,
        specifier: &str,
        referrer: Option<&str>,
        context: ImportContext,
    ) -> ModuleResult<E::Value> {
        // Builtins bypass resolution entirely.
        if specifier.starts_with("jsrt:") || specifier.starts_with("node:") {
            return self.load_builtin(specifier);
        }

        let resolved = self.resolver.resolve(specifier, referrer, context.is_esm())?;
        if resolved.is_builtin {
            return self.load_builtin(&resolved.resolved);
        }

        let key = resolved.resolved.clone();
        {
            let mut cache = self.cache.borrow_mut();
            if let Some(value) = cache.get(&key) {
                debug!(specifier, key = %key, "module cache hit");
                return Ok(value.clone());
            }
        }

        let (format, preloaded) = self.detect_format(&resolved)?;
        debug!(specifier, key = %key, ?format, "dispatching to loader");

        match format {
            ModuleFormat::Json => self.load_json(&key, preloaded),
            ModuleFormat::CommonJs => self.load_commonjs(&key, specifier, preloaded),
            ModuleFormat::Esm => self.load_esm(&key, specifier, preloaded),
            ModuleFormat::Unknown => Err(ModuleError::UnsupportedFormat { path: key }),
        }
    }

    /// Run format detection, loading content through the dispatcher only
    /// when the extension and manifest stages are inconclusive. Preloaded
    /// bytes are handed down so the loader does not read twice.
    fn detect_format(
        &self,
        resolved: &ResolvedPath,
    ) -> ModuleResult<(ModuleFormat, Option<Vec<u8>>)> {
        let key = &resolved.resolved;

        let by_extension = detector::detect_by_extension(key);
        if by_extension != ModuleFormat::Unknown {
            return Ok((by_extension, None));
        }

        if !resolved.is_url {
            let by_manifest = detector::detect_by_manifest(key);
            if by_manifest != ModuleFormat::Unknown {
                return Ok((by_manifest, None));
            }
        }

        let bytes = self.registry.load(key)?;
        let source = String::from_utf8_lossy(&bytes);
        let format = match detector::analyze(&source) {
            ModuleFormat::Unknown => ModuleFormat::CommonJs,
            format => format,
        };
        Ok((format, Some(bytes)))
    }

    /// Fetch module bytes, honoring any content already loaded during
    /// format detection.
    pub(crate) fn load_bytes(
        &self,
        resolved: &str,
        preloaded: Option<Vec<u8>>,
    ) -> ModuleResult<Vec<u8>> {
        match preloaded {
            Some(bytes) => Ok(bytes),
            None => self.registry.load(resolved),
        }
    }

    /// Facade counters.
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            loads: self.loads.get(),
            failures: self.failures.get(),
        }
    }

    /// Module cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }
}
