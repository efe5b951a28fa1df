//! ES module loader.
//!
//! Compiles source in "module, compile-only" mode, attaches `import.meta`
//! (`url` plus a `resolve` bound to the module's directory), then lets the
//! engine link and evaluate. The namespace object is cached and returned
//! so CommonJS callers observe a value.

use super::strip_shebang;
use crate::error::{ModuleError, ModuleResult};
use crate::loader::{ImportContext, ModuleLoader};
use crate::path;
use jsrt_engine::{Engine, EngineError, ImportMeta};
use std::rc::Rc;
use tracing::debug;

/// `import.meta.url` for a resolved module: URLs pass through, file paths
/// get the canonical `file://` form.
fn meta_url(resolved: &str) -> String {
    if resolved.contains("://") {
        resolved.to_string()
    } else {
        path::to_file_url(resolved)
    }
}

impl<E: Engine> ModuleLoader<E> {
    pub(crate) fn load_esm(
        &self,
        resolved: &str,
        specifier: &str,
        preloaded: Option<Vec<u8>>,
    ) -> ModuleResult<E::Value> {
        let bytes = self.load_bytes(resolved, preloaded)?;
        let source = strip_shebang(&String::from_utf8_lossy(&bytes));

        let engine = self.engine().clone();
        let module = engine
            .compile_module(&source, resolved)
            .map_err(|err| ModuleError::load_failed(specifier, err))?;

        engine.set_import_meta(
            &module,
            ImportMeta {
                url: meta_url(resolved),
                resolve: self.make_meta_resolve(resolved),
            },
        )?;

        engine
            .evaluate_module(&module)
            .map_err(|err| ModuleError::load_failed(specifier, err))?;

        let namespace = engine.module_namespace(&module)?;
        self.cache.borrow_mut().put(resolved, namespace.clone())?;

        debug!(resolved, "es module evaluated");
        Ok(namespace)
    }

    /// `import.meta.resolve(specifier)`: resolve against this module and
    /// return the `file://` form of the result.
    fn make_meta_resolve(&self, resolved: &str) -> jsrt_engine::ImportMetaResolve {
        let weak = self.weak_handle();
        let referrer = resolved.to_string();

        Rc::new(move |spec: &str| {
            let loader = weak
                .upgrade()
                .ok_or_else(|| EngineError::internal("module loader dropped"))?;
            let outcome = loader
                .resolve(spec, Some(&referrer), ImportContext::Esm)
                .map_err(|err| EngineError::script(err.code(), err.to_string()))?;
            Ok(if outcome.is_url || outcome.is_builtin {
                outcome.resolved
            } else {
                path::to_file_url(&outcome.resolved)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_url_forms() {
        assert_eq!(meta_url("/tmp/x/m.mjs"), "file:///tmp/x/m.mjs");
        assert_eq!(meta_url("C:\\tmp\\x\\m.mjs"), "file:///C:/tmp/x/m.mjs");
        assert_eq!(
            meta_url("https://example.com/m.mjs"),
            "https://example.com/m.mjs"
        );
    }
}
