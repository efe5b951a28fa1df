//! jsrt WebCrypto core.
//!
//! One operation table indirects every cryptographic primitive through
//! either the statically linked bundled providers or symbols resolved
//! from the platform OpenSSL at initialization; higher layers never
//! branch on backend identity. On top of the table sit the symmetric
//! cipher engine (AES CBC/GCM/CTR), the digest/HMAC/RSA/KDF/EC engines,
//! Web-standard randomness, and the `crypto.subtle` operation surface.

pub mod backend;
pub mod digest;
pub mod ec;
mod error;
pub mod hmac;
pub mod kdf;
pub mod random;
pub mod rsa;
pub mod subtle;
pub mod symmetric;

pub use backend::{BackendKind, BackendPreference, CryptoBackend};
pub use digest::HashAlgorithm;
pub use error::{CryptoError, CryptoResult};
pub use symmetric::SymmetricParams;
