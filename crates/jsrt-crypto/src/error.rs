//! Crypto errors.
//!
//! Every variant maps to the DOM exception name the WebCrypto surface
//! reports: synchronous failures here become rejected promises with that
//! name on the JavaScript side.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// Algorithm or parameter combination this build cannot do.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The operation failed; deliberately unspecific (a failed GCM tag
    /// check is indistinguishable from any other decryption failure).
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Key or parameter misuse (wrong key type, missing usage).
    #[error("Invalid access: {0}")]
    InvalidAccess(String),

    /// `getRandomValues` on a non-integer TypedArray.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// `getRandomValues` request above the 65536-byte cap.
    #[error("Quota exceeded: requested {requested} bytes (limit {limit})")]
    QuotaExceeded { requested: usize, limit: usize },
}

impl CryptoError {
    pub fn not_supported(detail: impl Into<String>) -> Self {
        CryptoError::NotSupported(detail.into())
    }

    pub fn operation(detail: impl Into<String>) -> Self {
        CryptoError::Operation(detail.into())
    }

    pub fn invalid_access(detail: impl Into<String>) -> Self {
        CryptoError::InvalidAccess(detail.into())
    }

    /// DOM exception name for the JavaScript-facing wrapper.
    pub fn dom_name(&self) -> &'static str {
        match self {
            CryptoError::NotSupported(_) => "NotSupportedError",
            CryptoError::Operation(_) => "OperationError",
            CryptoError::InvalidAccess(_) => "InvalidAccessError",
            CryptoError::TypeMismatch(_) => "TypeMismatchError",
            CryptoError::QuotaExceeded { .. } => "QuotaExceededError",
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
