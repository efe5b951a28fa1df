//! Web-standard randomness: `getRandomValues` and `randomUUID`.

use crate::backend;
use crate::error::{CryptoError, CryptoResult};

/// Per-call byte cap on `getRandomValues`.
pub const MAX_RANDOM_VALUES_BYTES: usize = 65536;

/// Fill a caller-owned buffer with cryptographically secure random
/// bytes. The JavaScript wrapper returns the same TypedArray reference it
/// was given; the byte-length quota is enforced here.
pub fn get_random_values(buf: &mut [u8]) -> CryptoResult<()> {
    if buf.len() > MAX_RANDOM_VALUES_BYTES {
        return Err(CryptoError::QuotaExceeded {
            requested: buf.len(),
            limit: MAX_RANDOM_VALUES_BYTES,
        });
    }
    backend::active()?.random_bytes(buf)
}

/// Unbounded random fill for internal key and IV generation.
pub fn fill_random(buf: &mut [u8]) -> CryptoResult<()> {
    backend::active()?.random_bytes(buf)
}

/// RFC 4122 version-4 UUID string.
pub fn random_uuid() -> CryptoResult<String> {
    backend::active()?.random_uuid()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_random_values_quota() {
        let mut ok = vec![0u8; MAX_RANDOM_VALUES_BYTES];
        get_random_values(&mut ok).unwrap();

        let mut too_big = vec![0u8; MAX_RANDOM_VALUES_BYTES + 1];
        let err = get_random_values(&mut too_big).unwrap_err();
        assert_eq!(err.dom_name(), "QuotaExceededError");
    }

    #[test]
    fn test_consecutive_fills_differ() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        get_random_values(&mut a).unwrap();
        get_random_values(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_uuid_shape() {
        let uuid = random_uuid().unwrap();
        assert_eq!(uuid.len(), 36);
        let chars: Vec<char> = uuid.chars().collect();
        assert_eq!(chars[8], '-');
        assert_eq!(chars[13], '-');
        assert_eq!(chars[18], '-');
        assert_eq!(chars[23], '-');
        // Version nibble is 4; variant nibble is 8, 9, a, or b.
        assert_eq!(chars[14], '4');
        assert!(matches!(chars[19], '8' | '9' | 'a' | 'b'));
    }

    #[test]
    fn test_random_uuids_unique() {
        let a = random_uuid().unwrap();
        let b = random_uuid().unwrap();
        assert_ne!(a, b);
    }
}
