//! JSON loader: bytes through the dispatcher, parsed by the engine's JSON
//! parser, cached as the module value.

use crate::error::{ModuleError, ModuleResult};
use crate::loader::ModuleLoader;
use jsrt_engine::Engine;
use tracing::debug;

impl<E: Engine> ModuleLoader<E> {
    pub(crate) fn load_json(
        &self,
        resolved: &str,
        preloaded: Option<Vec<u8>>,
    ) -> ModuleResult<E::Value> {
        let bytes = self.load_bytes(resolved, preloaded)?;
        let value = self
            .engine()
            .parse_json(&bytes)
            .map_err(|err| ModuleError::load_failed(resolved, err))?;
        self.cache.borrow_mut().put(resolved, value.clone())?;
        debug!(resolved, "json module parsed");
        Ok(value)
    }
}
