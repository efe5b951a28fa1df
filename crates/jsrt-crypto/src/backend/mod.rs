//! Crypto backend abstraction.
//!
//! One operation table is active per process: either the statically
//! linked bundled provider, or a table of thin wrappers over symbols
//! resolved from the platform OpenSSL at initialization. Higher-level
//! engines never branch on backend identity; they call through
//! [`active`].

mod dynamic_backend;
mod static_backend;

pub use dynamic_backend::DynamicBackend;
pub use static_backend::StaticBackend;

use crate::digest::HashAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::SymmetricParams;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Which provider a table is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Statically linked bundled provider.
    Static,
    /// Late-bound symbols from the platform crypto library.
    Dynamic,
}

/// How to choose the table at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Try the dynamic provider, fall back to static.
    #[default]
    Auto,
    Static,
    Dynamic,
}

/// The operation table. Every operation either completes and returns its
/// output, or fails without touching anything.
pub trait CryptoBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Provider version string.
    fn version(&self) -> String;

    /// Release provider resources (dynamic library handles live for the
    /// process; this closes them at shutdown).
    fn cleanup(&self) {}

    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>>;

    fn generate_aes_key(&self, length_bits: usize) -> CryptoResult<Vec<u8>>;

    /// For GCM the returned buffer is `ciphertext || tag`.
    fn aes_encrypt(&self, params: &SymmetricParams, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// For GCM the trailing tag bytes are split off and verified.
    fn aes_decrypt(&self, params: &SymmetricParams, ciphertext: &[u8]) -> CryptoResult<Vec<u8>>;

    fn random_bytes(&self, buf: &mut [u8]) -> CryptoResult<()>;

    fn random_uuid(&self) -> CryptoResult<String>;
}

static ACTIVE_BACKEND: OnceLock<Arc<dyn CryptoBackend>> = OnceLock::new();

/// Install the backend per preference. Only the first installation in a
/// process takes effect; the table is written once and read without
/// locking thereafter.
pub fn init(preference: BackendPreference) -> CryptoResult<BackendKind> {
    let backend = ACTIVE_BACKEND.get_or_init(|| select(preference));
    Ok(backend.kind())
}

/// The active operation table, installing the default (Auto) selection on
/// first use.
pub fn active() -> CryptoResult<Arc<dyn CryptoBackend>> {
    Ok(ACTIVE_BACKEND
        .get_or_init(|| select(BackendPreference::Auto))
        .clone())
}

fn select(preference: BackendPreference) -> Arc<dyn CryptoBackend> {
    match preference {
        BackendPreference::Static => Arc::new(StaticBackend::new()),
        BackendPreference::Dynamic => match DynamicBackend::load() {
            Ok(backend) => {
                debug!(version = %backend.version(), "dynamic crypto backend initialized");
                Arc::new(backend)
            }
            Err(err) => {
                warn!(%err, "dynamic crypto backend unavailable; using static");
                Arc::new(StaticBackend::new())
            }
        },
        BackendPreference::Auto => match DynamicBackend::load() {
            Ok(backend) => {
                debug!(version = %backend.version(), "dynamic crypto backend initialized");
                Arc::new(backend)
            }
            Err(_) => Arc::new(StaticBackend::new()),
        },
    }
}

/// Consistency checks shared by both backends.
pub(crate) fn check_aes_key(key: &[u8]) -> CryptoResult<()> {
    if !matches!(key.len(), 16 | 24 | 32) {
        return Err(CryptoError::operation(format!(
            "invalid AES key length {}",
            key.len()
        )));
    }
    Ok(())
}
