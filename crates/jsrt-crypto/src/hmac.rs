//! HMAC over the SHA family.
//!
//! Verification computes the MAC over the whole input and compares in
//! constant time; there is no early exit on byte mismatch.

use crate::digest::HashAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::random;
use ring::hmac as ring_hmac;

fn ring_algorithm(algorithm: HashAlgorithm) -> ring_hmac::Algorithm {
    match algorithm {
        HashAlgorithm::Sha1 => ring_hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
        HashAlgorithm::Sha256 => ring_hmac::HMAC_SHA256,
        HashAlgorithm::Sha384 => ring_hmac::HMAC_SHA384,
        HashAlgorithm::Sha512 => ring_hmac::HMAC_SHA512,
    }
}

/// Generate a random key of the hash's block size.
pub fn generate_key(algorithm: HashAlgorithm) -> CryptoResult<Vec<u8>> {
    let mut key = vec![0u8; algorithm.block_len()];
    random::fill_random(&mut key)?;
    Ok(key)
}

/// Compute the MAC of `data` under `key`.
pub fn sign(algorithm: HashAlgorithm, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    if key.is_empty() {
        return Err(CryptoError::invalid_access("empty HMAC key"));
    }
    let key = ring_hmac::Key::new(ring_algorithm(algorithm), key);
    Ok(ring_hmac::sign(&key, data).as_ref().to_vec())
}

/// Constant-time verification of a MAC.
pub fn verify(
    algorithm: HashAlgorithm,
    key: &[u8],
    signature: &[u8],
    data: &[u8],
) -> CryptoResult<bool> {
    if key.is_empty() {
        return Err(CryptoError::invalid_access("empty HMAC key"));
    }
    let key = ring_hmac::Key::new(ring_algorithm(algorithm), key);
    Ok(ring_hmac::verify(&key, data, signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip_all_algorithms() {
        for algorithm in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let key = generate_key(algorithm).unwrap();
            assert_eq!(key.len(), algorithm.block_len());
            let mac = sign(algorithm, &key, b"message").unwrap();
            assert_eq!(mac.len(), algorithm.output_len());
            assert!(verify(algorithm, &key, &mac, b"message").unwrap());
            assert!(!verify(algorithm, &key, &mac, b"Message").unwrap());
        }
    }

    #[test]
    fn test_rfc4231_vector_sha256() {
        // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?"
        let mac = sign(HashAlgorithm::Sha256, b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let key = generate_key(HashAlgorithm::Sha256).unwrap();
        let mut mac = sign(HashAlgorithm::Sha256, &key, b"msg").unwrap();
        mac[0] ^= 0x80;
        assert!(!verify(HashAlgorithm::Sha256, &key, &mac, b"msg").unwrap());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = sign(HashAlgorithm::Sha256, b"", b"msg").unwrap_err();
        assert_eq!(err.dom_name(), "InvalidAccessError");
    }
}
