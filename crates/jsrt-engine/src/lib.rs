//! Engine interface for the jsrt runtime core.
//!
//! The module subsystem never talks to a concrete JavaScript engine; it is
//! generic over the [`Engine`] trait defined here. An embedder implements
//! the trait over its engine bindings, and the loaders drive it: they build
//! wrapper scripts, evaluate them, read `module.exports` back, compile ES
//! modules, and attach `import.meta`.
//!
//! Values are opaque handles owned by the engine. The trait requires
//! `Clone` so handles can be stored in the module cache and handed out on
//! repeated loads; cloning must be reference-like, not a deep copy.

mod error;

pub use error::{EngineError, EngineResult};

use std::rc::Rc;

/// A host function callable from JavaScript.
///
/// The closure receives the call arguments and returns a value or an error
/// the engine converts into a thrown exception. `Rc` because the same
/// function object (e.g. a module's `require`) may be referenced from
/// several places.
pub type HostFunction<E> =
    Rc<dyn Fn(&[<E as Engine>::Value]) -> EngineResult<<E as Engine>::Value>>;

/// Callback behind `import.meta.resolve()`: resolves a specifier relative
/// to the owning module and returns the `file://` form of the result.
pub type ImportMetaResolve = Rc<dyn Fn(&str) -> EngineResult<String>>;

/// The `import.meta` object attached to every compiled ES module.
pub struct ImportMeta {
    /// `file://` URL of the module's resolved path.
    pub url: String,
    /// `import.meta.resolve(specifier)` bound to the module's directory.
    pub resolve: ImportMetaResolve,
}

/// The JavaScript engine collaborator.
///
/// Covers exactly what the module subsystem needs: value creation for
/// primitives, objects, arrays and errors; property access; function
/// calls; evaluation of source under script or module semantics; module
/// namespace retrieval; and JSON parsing. The event loop, host APIs and
/// everything else an engine provides are out of scope here.
pub trait Engine: Sized + 'static {
    /// Opaque value handle. Cloning is reference-like.
    type Value: Clone + 'static;

    /// Opaque compiled-module handle ("module, compile-only" output).
    type ModuleHandle;

    // --- value creation ---

    fn undefined(&self) -> Self::Value;
    fn boolean(&self, value: bool) -> Self::Value;
    fn number(&self, value: f64) -> Self::Value;
    fn string(&self, value: &str) -> Self::Value;
    fn object(&self) -> EngineResult<Self::Value>;
    fn array(&self, items: &[Self::Value]) -> EngineResult<Self::Value>;
    fn error(&self, message: &str) -> EngineResult<Self::Value>;

    /// Create a function value backed by a host closure.
    fn function(&self, name: &str, func: HostFunction<Self>) -> EngineResult<Self::Value>;

    /// Read a string value back out of the engine; `None` when the value
    /// is not a string. Used by host functions taking string arguments
    /// (`require`, `import.meta.resolve`).
    fn as_string(&self, value: &Self::Value) -> Option<String>;

    // --- property access ---

    fn get(&self, target: &Self::Value, key: &str) -> EngineResult<Self::Value>;
    fn set(&self, target: &Self::Value, key: &str, value: Self::Value) -> EngineResult<()>;
    fn delete(&self, target: &Self::Value, key: &str) -> EngineResult<()>;

    // --- calls and evaluation ---

    fn is_function(&self, value: &Self::Value) -> bool;

    /// Call `func` with the given `this` and arguments. A thrown exception
    /// is captured and returned as [`EngineError::Script`].
    fn call(
        &self,
        func: &Self::Value,
        this: &Self::Value,
        args: &[Self::Value],
    ) -> EngineResult<Self::Value>;

    /// Evaluate source under script semantics and return the completion
    /// value. `filename` is used for stack traces.
    fn eval_script(&self, source: &str, filename: &str) -> EngineResult<Self::Value>;

    /// Compile source under module semantics without evaluating it.
    fn compile_module(&self, source: &str, filename: &str) -> EngineResult<Self::ModuleHandle>;

    /// Attach `import.meta` to a compiled module before evaluation.
    fn set_import_meta(&self, module: &Self::ModuleHandle, meta: ImportMeta) -> EngineResult<()>;

    /// Link and evaluate a compiled module.
    fn evaluate_module(&self, module: &Self::ModuleHandle) -> EngineResult<()>;

    /// The module namespace object exposing an evaluated module's named
    /// exports; used as the return value when ESM is loaded from CommonJS.
    fn module_namespace(&self, module: &Self::ModuleHandle) -> EngineResult<Self::Value>;

    // --- JSON ---

    /// Parse bytes as JSON into an engine value.
    fn parse_json(&self, bytes: &[u8]) -> EngineResult<Self::Value>;
}
