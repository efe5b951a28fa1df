//! Protocol registry and dispatcher.
//!
//! A process-wide table of named transports guarded by a mutex. Lookup
//! clones the handler `Arc` out of the lock so loads run unlocked.

use super::ProtocolHandler;
use crate::error::{ModuleError, ModuleResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry slot cap.
const MAX_PROTOCOLS: usize = 16;

/// Maximum accepted scheme length.
const MAX_SCHEME_LEN: usize = 16;

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')
}

/// Extract and validate the scheme of a URL.
///
/// The scheme is the longest prefix of valid scheme characters before the
/// first `:`; it must be 1..=16 characters and followed by `://`. The
/// returned scheme is lowercased. Returns `None` for scheme-less inputs.
pub fn extract_scheme(url: &str) -> Option<String> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    if scheme.is_empty() || scheme.len() > MAX_SCHEME_LEN {
        return None;
    }
    if !scheme.chars().all(is_scheme_char) {
        return None;
    }
    if !url[colon..].starts_with("://") {
        return None;
    }
    Some(scheme.to_ascii_lowercase())
}

/// Named-transport table. See [`ProtocolHandler`].
pub struct ProtocolRegistry {
    handlers: Mutex<HashMap<String, Arc<dyn ProtocolHandler>>>,
}

impl ProtocolRegistry {
    /// An empty registry. Most callers want [`ProtocolRegistry::with_defaults`].
    pub fn new() -> Self {
        ProtocolRegistry {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// A registry with the always-present `file`, `http`, and `https`
    /// transports.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry
            .register("file", Arc::new(super::FileHandler::new()))
            .expect("empty registry accepts file handler");
        let http = Arc::new(super::HttpHandler::new(Default::default()));
        registry
            .register("http", http.clone())
            .expect("empty registry accepts http handler");
        registry
            .register("https", http)
            .expect("empty registry accepts https handler");
        registry
    }

    /// Register a transport under a scheme name. Fails when the name is
    /// invalid, already bound, or the table is full.
    pub fn register(
        &self,
        scheme: &str,
        handler: Arc<dyn ProtocolHandler>,
    ) -> ModuleResult<()> {
        if scheme.is_empty()
            || scheme.len() > MAX_SCHEME_LEN
            || !scheme.chars().all(is_scheme_char)
        {
            return Err(ModuleError::UnsupportedProtocol {
                scheme: scheme.to_string(),
            });
        }
        let key = scheme.to_ascii_lowercase();
        let mut handlers = self.handlers.lock();
        if handlers.contains_key(&key) {
            return Err(ModuleError::UnsupportedProtocol { scheme: key });
        }
        if handlers.len() >= MAX_PROTOCOLS {
            return Err(ModuleError::UnsupportedProtocol { scheme: key });
        }
        debug!(scheme = %key, total = handlers.len() + 1, "registered protocol handler");
        handlers.insert(key, handler);
        Ok(())
    }

    /// Look up a handler; the clone stays valid after unregistration.
    pub fn get(&self, scheme: &str) -> Option<Arc<dyn ProtocolHandler>> {
        self.handlers.lock().get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Remove a transport, running its cleanup.
    pub fn unregister(&self, scheme: &str) -> bool {
        let removed = self.handlers.lock().remove(&scheme.to_ascii_lowercase());
        match removed {
            Some(handler) => {
                handler.cleanup();
                debug!(scheme, "unregistered protocol handler");
                true
            }
            None => false,
        }
    }

    pub fn has_protocol(&self, scheme: &str) -> bool {
        self.handlers.lock().contains_key(&scheme.to_ascii_lowercase())
    }

    /// Names of all registered transports.
    pub fn registered_protocols(&self) -> Vec<String> {
        self.handlers.lock().keys().cloned().collect()
    }

    /// Dispatch a load: scheme-less URLs default to `file`; a missing
    /// handler is an unsupported protocol.
    pub fn load(&self, url: &str) -> ModuleResult<Vec<u8>> {
        let scheme = extract_scheme(url).unwrap_or_else(|| "file".to_string());
        let handler = self
            .get(&scheme)
            .ok_or(ModuleError::UnsupportedProtocol {
                scheme: scheme.clone(),
            })?;
        debug!(url, scheme = %scheme, "dispatching protocol load");
        handler.load(url)
    }

    /// Run every handler's cleanup and empty the table.
    pub fn shutdown(&self) {
        let mut handlers = self.handlers.lock();
        for (_, handler) in handlers.drain() {
            handler.cleanup();
        }
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
