//! Builtin loader.
//!
//! `jsrt:` names dispatch against the runtime table; `node:` names go
//! through the compatibility registry. Results are cached under the
//! original specifier string, so each builtin initializes once.

use crate::error::{ModuleError, ModuleResult};
use crate::loader::ModuleLoader;
use jsrt_engine::Engine;
use tracing::debug;

impl<E: Engine> ModuleLoader<E> {
    pub(crate) fn load_builtin(&self, specifier: &str) -> ModuleResult<E::Value> {
        {
            let mut cache = self.cache.borrow_mut();
            if let Some(value) = cache.get(specifier) {
                return Ok(value.clone());
            }
        }

        let (scheme, name) =
            specifier
                .split_once(':')
                .ok_or_else(|| ModuleError::InvalidSpecifier {
                    specifier: specifier.to_string(),
                })?;

        let init = match scheme {
            "jsrt" => self.jsrt_builtins.borrow().get(name).cloned(),
            "node" => self.node_builtins.borrow().get(name).cloned(),
            _ => None,
        }
        .ok_or_else(|| ModuleError::NotFound {
            specifier: specifier.to_string(),
        })?;

        let value =
            init(self.engine()).map_err(|err| ModuleError::load_failed(specifier, err))?;
        self.cache.borrow_mut().put(specifier, value.clone())?;
        debug!(specifier, "builtin module initialized");
        Ok(value)
    }
}
