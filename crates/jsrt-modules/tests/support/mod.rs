//! A scriptable in-memory engine for loader integration tests.
//!
//! The mock cannot parse JavaScript; instead, tests register Rust
//! closures keyed by filename that play the role of the module body. The
//! loader machinery under test is real: wrapping, require bridging, cycle
//! handling, caching, import.meta attachment.

use jsrt_engine::{Engine, EngineError, EngineResult, HostFunction, ImportMeta};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Reference-semantics mock value.
#[derive(Clone)]
pub struct MockValue(Rc<RefCell<Inner>>);

impl std::fmt::Debug for MockValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &*self.0.borrow() {
            Inner::Undefined => write!(f, "Undefined"),
            Inner::Bool(b) => write!(f, "Bool({b:?})"),
            Inner::Number(n) => write!(f, "Number({n:?})"),
            Inner::Str(s) => write!(f, "Str({s:?})"),
            Inner::Object(o) => write!(f, "Object({o:?})"),
            Inner::Array(a) => write!(f, "Array({a:?})"),
            Inner::Function { .. } => write!(f, "Function(..)"),
        }
    }
}

enum Inner {
    Undefined,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(HashMap<String, MockValue>),
    Array(Vec<MockValue>),
    Function { body: FunctionBody },
}

type FunctionBody = Rc<dyn Fn(&[MockValue]) -> EngineResult<MockValue>>;

/// Plays a CommonJS wrapper function: receives
/// `(exports, require, module, __filename, __dirname)`.
pub type ScriptBody = Rc<dyn Fn(&[MockValue]) -> EngineResult<MockValue>>;

/// Plays an ES module body: receives `import.meta` and the namespace
/// object to populate.
pub type ModuleBody = Rc<dyn Fn(&ImportMeta, &MockValue) -> EngineResult<()>>;

impl MockValue {
    fn new(inner: Inner) -> Self {
        MockValue(Rc::new(RefCell::new(inner)))
    }

    pub fn ptr_eq(&self, other: &MockValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_number(&self) -> Option<f64> {
        match &*self.0.borrow() {
            Inner::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match &*self.0.borrow() {
            Inner::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(&*self.0.borrow(), Inner::Undefined)
    }
}

/// The compiled-module handle produced by [`MockEngine::compile_module`].
pub struct MockModule {
    meta: RefCell<Option<ImportMeta>>,
    namespace: MockValue,
    body: Option<ModuleBody>,
}

#[derive(Default)]
pub struct MockEngine {
    scripts: RefCell<HashMap<String, ScriptBody>>,
    module_bodies: RefCell<HashMap<String, ModuleBody>>,
}

/// The textual prefix every CommonJS wrapper must carry.
pub const WRAPPER_PREFIX: &str = "(function (exports, require, module, __filename, __dirname) {";

impl MockEngine {
    pub fn new() -> Rc<Self> {
        Rc::new(MockEngine::default())
    }

    /// Register the behavior of a CommonJS module body for a filename.
    pub fn register_script(&self, filename: impl Into<String>, body: ScriptBody) {
        self.scripts.borrow_mut().insert(filename.into(), body);
    }

    /// Register the behavior of an ES module body for a filename.
    pub fn register_module(&self, filename: impl Into<String>, body: ModuleBody) {
        self.module_bodies.borrow_mut().insert(filename.into(), body);
    }

    /// Property read helper for assertions.
    pub fn prop(&self, target: &MockValue, key: &str) -> MockValue {
        self.get(target, key).unwrap()
    }
}

impl Engine for MockEngine {
    type Value = MockValue;
    type ModuleHandle = MockModule;

    fn undefined(&self) -> MockValue {
        MockValue::new(Inner::Undefined)
    }

    fn boolean(&self, value: bool) -> MockValue {
        MockValue::new(Inner::Bool(value))
    }

    fn number(&self, value: f64) -> MockValue {
        MockValue::new(Inner::Number(value))
    }

    fn string(&self, value: &str) -> MockValue {
        MockValue::new(Inner::Str(value.to_string()))
    }

    fn as_string(&self, value: &MockValue) -> Option<String> {
        value.as_str()
    }

    fn object(&self) -> EngineResult<MockValue> {
        Ok(MockValue::new(Inner::Object(HashMap::new())))
    }

    fn array(&self, items: &[MockValue]) -> EngineResult<MockValue> {
        Ok(MockValue::new(Inner::Array(items.to_vec())))
    }

    fn error(&self, message: &str) -> EngineResult<MockValue> {
        let error = self.object()?;
        self.set(&error, "message", self.string(message))?;
        Ok(error)
    }

    fn function(&self, _name: &str, func: HostFunction<Self>) -> EngineResult<MockValue> {
        Ok(MockValue::new(Inner::Function { body: func }))
    }

    fn get(&self, target: &MockValue, key: &str) -> EngineResult<MockValue> {
        match &*target.0.borrow() {
            Inner::Object(map) => Ok(map
                .get(key)
                .cloned()
                .unwrap_or_else(|| MockValue::new(Inner::Undefined))),
            _ => Err(EngineError::type_error("object", "non-object")),
        }
    }

    fn set(&self, target: &MockValue, key: &str, value: MockValue) -> EngineResult<()> {
        match &mut *target.0.borrow_mut() {
            Inner::Object(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            _ => Err(EngineError::type_error("object", "non-object")),
        }
    }

    fn delete(&self, target: &MockValue, key: &str) -> EngineResult<()> {
        match &mut *target.0.borrow_mut() {
            Inner::Object(map) => {
                map.remove(key);
                Ok(())
            }
            _ => Err(EngineError::type_error("object", "non-object")),
        }
    }

    fn is_function(&self, value: &MockValue) -> bool {
        matches!(&*value.0.borrow(), Inner::Function { .. })
    }

    fn call(
        &self,
        func: &MockValue,
        _this: &MockValue,
        args: &[MockValue],
    ) -> EngineResult<MockValue> {
        let body = match &*func.0.borrow() {
            Inner::Function { body } => body.clone(),
            _ => return Err(EngineError::type_error("function", "non-function")),
        };
        body(args)
    }

    fn eval_script(&self, source: &str, filename: &str) -> EngineResult<MockValue> {
        if !source.starts_with(WRAPPER_PREFIX) {
            return Err(EngineError::Compile {
                filename: filename.to_string(),
                message: "expected CommonJS wrapper".to_string(),
            });
        }
        let body = self
            .scripts
            .borrow()
            .get(filename)
            .cloned()
            .ok_or_else(|| EngineError::script("ReferenceError", format!("no script registered for {filename}")))?;
        Ok(MockValue::new(Inner::Function { body }))
    }

    fn compile_module(&self, _source: &str, filename: &str) -> EngineResult<MockModule> {
        let body = self.module_bodies.borrow().get(filename).cloned();
        let Some(body) = body else {
            return Err(EngineError::Compile {
                filename: filename.to_string(),
                message: "no module body registered".to_string(),
            });
        };
        Ok(MockModule {
            meta: RefCell::new(None),
            namespace: MockValue::new(Inner::Object(HashMap::new())),
            body: Some(body),
        })
    }

    fn set_import_meta(&self, module: &MockModule, meta: ImportMeta) -> EngineResult<()> {
        *module.meta.borrow_mut() = Some(meta);
        Ok(())
    }

    fn evaluate_module(&self, module: &MockModule) -> EngineResult<()> {
        let meta = module.meta.borrow();
        let meta = meta
            .as_ref()
            .ok_or_else(|| EngineError::internal("import.meta not attached"))?;
        if let Some(body) = &module.body {
            body(meta, &module.namespace)?;
        }
        Ok(())
    }

    fn module_namespace(&self, module: &MockModule) -> EngineResult<MockValue> {
        Ok(module.namespace.clone())
    }

    fn parse_json(&self, bytes: &[u8]) -> EngineResult<MockValue> {
        let parsed: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|err| EngineError::Json(err.to_string()))?;
        Ok(json_to_value(&parsed))
    }
}

fn json_to_value(value: &serde_json::Value) -> MockValue {
    match value {
        serde_json::Value::Null => MockValue::new(Inner::Undefined),
        serde_json::Value::Bool(b) => MockValue::new(Inner::Bool(*b)),
        serde_json::Value::Number(n) => {
            MockValue::new(Inner::Number(n.as_f64().unwrap_or(f64::NAN)))
        }
        serde_json::Value::String(s) => MockValue::new(Inner::Str(s.clone())),
        serde_json::Value::Array(items) => {
            MockValue::new(Inner::Array(items.iter().map(json_to_value).collect()))
        }
        serde_json::Value::Object(map) => {
            let converted = map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect();
            MockValue::new(Inner::Object(converted))
        }
    }
}
