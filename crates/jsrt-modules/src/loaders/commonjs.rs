//! CommonJS loader.
//!
//! Wraps source in the synthetic function expression, evaluates it as a
//! script, and invokes it with `(exports, require, module, __filename,
//! __dirname)`. A thread-local loading stack detects cycles: a module
//! already mid-evaluation answers with its current (partial) exports
//! instead of recursing.

use super::strip_shebang;
use crate::error::{ModuleError, ModuleResult};
use crate::loader::{ImportContext, ModuleLoader};
use crate::path;
use jsrt_engine::{Engine, EngineError};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Depth cap for the loading stack. Exceeding it aborts the chain.
pub const MAX_LOADING_DEPTH: usize = 100;

thread_local! {
    static LOADING_STACK: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn stack_contains(resolved: &str) -> bool {
    LOADING_STACK.with(|stack| stack.borrow().iter().any(|p| p == resolved))
}

fn stack_push(resolved: &str) -> ModuleResult<()> {
    LOADING_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.len() >= MAX_LOADING_DEPTH {
            return Err(ModuleError::LoadingStackOverflow {
                max_depth: MAX_LOADING_DEPTH,
            });
        }
        stack.push(resolved.to_string());
        debug!(resolved, depth = stack.len(), "pushed onto loading stack");
        Ok(())
    })
}

fn stack_pop() {
    LOADING_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Packages whose bodies read the bare identifier `t` where `exports`
/// would be correct. Recognized by path substring; only consulted when
/// the compatibility option is on.
const BABEL_SHAPE_PATHS: &[&str] = &["babel-types", "@babel/types"];

/// Prologue defining `t` as a proxy over `exports` that answers missing
/// `isXxx` lookups with a constant-false function.
const BABEL_COMPAT_PROLOGUE: &str = "var t = new Proxy(exports, { get: (target, prop) => prop in target ? target[prop] : (typeof prop === 'string' && prop.startsWith('is') ? () => false : undefined) });";

fn is_babel_shape(resolved: &str) -> bool {
    BABEL_SHAPE_PATHS.iter().any(|p| resolved.contains(p))
}

/// Build the module wrapper around prepared source.
pub(crate) fn wrap_source(source: &str, babel_compat: bool) -> String {
    if babel_compat {
        format!(
            "(function (exports, require, module, __filename, __dirname) {{ {BABEL_COMPAT_PROLOGUE}\n{source}\n}})"
        )
    } else {
        format!("(function (exports, require, module, __filename, __dirname) {{ {source}\n}})")
    }
}

/// `module.paths`: every ancestor's `node_modules` directory, nearest
/// first.
fn node_modules_paths(dir: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = dir.to_string();
    loop {
        if !current.ends_with("node_modules") {
            paths.push(path::join(&current, "node_modules"));
        }
        let parent = path::dirname(&current);
        if parent == current {
            break;
        }
        current = parent;
    }
    paths
}

impl<E: Engine> ModuleLoader<E> {
    pub(crate) fn load_commonjs(
        &self,
        resolved: &str,
        specifier: &str,
        preloaded: Option<Vec<u8>>,
    ) -> ModuleResult<E::Value> {
        if stack_contains(resolved) {
            warn!(resolved, "require cycle detected; returning partial exports");
            let in_progress = self.in_progress.borrow();
            let module_obj = in_progress.get(resolved).ok_or_else(|| {
                ModuleError::load_failed(specifier, "cyclic load with no in-progress record")
            })?;
            return Ok(self.engine().get(module_obj, "exports")?);
        }

        stack_push(resolved)?;
        let result = self.eval_commonjs(resolved, specifier, preloaded);
        stack_pop();
        self.in_progress.borrow_mut().remove(resolved);

        if result.is_err() {
            // Drop any speculative cache entry before propagating.
            self.cache.borrow_mut().remove(resolved);
        }
        result
    }

    fn eval_commonjs(
        &self,
        resolved: &str,
        specifier: &str,
        preloaded: Option<Vec<u8>>,
    ) -> ModuleResult<E::Value> {
        let bytes = self.load_bytes(resolved, preloaded)?;
        let source = strip_shebang(&String::from_utf8_lossy(&bytes));

        let engine = self.engine().clone();
        let dirname = path::dirname(resolved);

        let exports = engine.object()?;
        let module_obj = engine.object()?;
        engine.set(&module_obj, "id", engine.string(resolved))?;
        engine.set(&module_obj, "filename", engine.string(resolved))?;
        engine.set(&module_obj, "path", engine.string(&dirname))?;
        engine.set(&module_obj, "loaded", engine.boolean(false))?;
        engine.set(&module_obj, "exports", exports.clone())?;
        engine.set(&module_obj, "parent", engine.undefined())?;
        engine.set(&module_obj, "children", engine.array(&[])?)?;

        let paths: Vec<E::Value> = node_modules_paths(&dirname)
            .iter()
            .map(|p| engine.string(p))
            .collect();
        engine.set(&module_obj, "paths", engine.array(&paths)?)?;

        let require_fn = self.make_require(resolved)?;
        engine.set(&module_obj, "require", require_fn.clone())?;

        self.in_progress
            .borrow_mut()
            .insert(resolved.to_string(), module_obj.clone());

        let babel = self.options().babel_compat && is_babel_shape(resolved);
        let wrapper = wrap_source(&source, babel);

        let func = engine
            .eval_script(&wrapper, resolved)
            .map_err(|err| ModuleError::load_failed(specifier, err))?;
        if !engine.is_function(&func) {
            return Err(ModuleError::load_failed(
                specifier,
                "module wrapper did not evaluate to a function",
            ));
        }

        let this = engine.undefined();
        let args = [
            exports,
            require_fn,
            module_obj.clone(),
            engine.string(resolved),
            engine.string(&dirname),
        ];
        engine
            .call(&func, &this, &args)
            .map_err(|err| ModuleError::load_failed(specifier, err))?;

        // The body may have reassigned module.exports; read it back.
        let final_exports = engine.get(&module_obj, "exports")?;
        self.cache.borrow_mut().put(resolved, final_exports.clone())?;
        engine.set(&module_obj, "loaded", engine.boolean(true))?;

        debug!(resolved, "commonjs module evaluated");
        Ok(final_exports)
    }

    /// Build the `require` function bound to a module: string argument,
    /// delegates to the facade with this module as the referrer.
    fn make_require(&self, resolved: &str) -> ModuleResult<E::Value> {
        let weak = self.weak_handle();
        let referrer = resolved.to_string();
        let engine = self.engine().clone();

        let host = Rc::new(move |args: &[E::Value]| {
            let loader = weak
                .upgrade()
                .ok_or_else(|| EngineError::internal("module loader dropped"))?;
            let spec = args
                .first()
                .and_then(|v| engine.as_string(v))
                .ok_or_else(|| EngineError::type_error("string specifier", "non-string"))?;
            loader
                .load_with_context(&spec, Some(&referrer), ImportContext::Cjs)
                .map_err(|err| EngineError::script(err.code(), err.to_string()))
        });

        Ok(self.engine().function("require", host)?)
    }
}
