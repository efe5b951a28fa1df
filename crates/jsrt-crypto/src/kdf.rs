//! Key derivation: PBKDF2 and HKDF.

use crate::digest::HashAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

/// PBKDF2 with an HMAC pseudo-random function over the chosen hash.
pub fn pbkdf2_derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    algorithm: HashAlgorithm,
    output_len: usize,
) -> CryptoResult<Vec<u8>> {
    if iterations == 0 {
        return Err(CryptoError::operation("PBKDF2 requires iterations > 0"));
    }
    if output_len == 0 {
        return Err(CryptoError::operation("PBKDF2 output length must be > 0"));
    }

    let mut out = vec![0u8; output_len];
    match algorithm {
        HashAlgorithm::Sha1 => pbkdf2_hmac::<Sha1>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha256 => pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha384 => pbkdf2_hmac::<Sha384>(password, salt, iterations, &mut out),
        HashAlgorithm::Sha512 => pbkdf2_hmac::<Sha512>(password, salt, iterations, &mut out),
    }
    Ok(out)
}

/// HKDF extract-and-expand. A missing salt means a salt of zeros of the
/// hash's output length, per RFC 5869.
pub fn hkdf_derive(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: Option<&[u8]>,
    algorithm: HashAlgorithm,
    output_len: usize,
) -> CryptoResult<Vec<u8>> {
    let info = info.unwrap_or(&[]);
    let mut out = vec![0u8; output_len];

    let expand_failed =
        |_| CryptoError::operation(format!("HKDF output length {output_len} too long"));

    match algorithm {
        HashAlgorithm::Sha1 => Hkdf::<Sha1>::new(salt, ikm)
            .expand(info, &mut out)
            .map_err(expand_failed)?,
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::new(salt, ikm)
            .expand(info, &mut out)
            .map_err(expand_failed)?,
        HashAlgorithm::Sha384 => Hkdf::<Sha384>::new(salt, ikm)
            .expand(info, &mut out)
            .map_err(expand_failed)?,
        HashAlgorithm::Sha512 => Hkdf::<Sha512>::new(salt, ikm)
            .expand(info, &mut out)
            .map_err(expand_failed)?,
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_rfc6070_vector() {
        // RFC 6070 test: P="password", S="salt", c=2, dkLen=20, SHA-1
        let out = pbkdf2_derive(b"password", b"salt", 2, HashAlgorithm::Sha1, 20).unwrap();
        assert_eq!(hex::encode(out), "ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957");
    }

    #[test]
    fn test_pbkdf2_sha256_vector() {
        // PBKDF2-HMAC-SHA256, c=1
        let out = pbkdf2_derive(b"password", b"salt", 1, HashAlgorithm::Sha256, 32).unwrap();
        assert_eq!(
            hex::encode(out),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn test_pbkdf2_rejects_zero_iterations() {
        assert!(pbkdf2_derive(b"p", b"s", 0, HashAlgorithm::Sha256, 16).is_err());
    }

    #[test]
    fn test_hkdf_rfc5869_case_1() {
        // RFC 5869 test case 1 (SHA-256).
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let out = hkdf_derive(&ikm, Some(&salt), Some(&info), HashAlgorithm::Sha256, 42).unwrap();
        assert_eq!(
            hex::encode(out),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_hkdf_missing_salt_is_zeros() {
        // Explicit zero salt of hash length must equal the absent-salt form.
        let ikm = b"input keying material";
        let zeros = [0u8; 32];
        let with_zeros =
            hkdf_derive(ikm, Some(&zeros), None, HashAlgorithm::Sha256, 32).unwrap();
        let with_none = hkdf_derive(ikm, None, None, HashAlgorithm::Sha256, 32).unwrap();
        assert_eq!(with_zeros, with_none);
    }

    #[test]
    fn test_hkdf_output_too_long_rejected() {
        // Expand caps output at 255 * hash length.
        let err = hkdf_derive(b"ikm", None, None, HashAlgorithm::Sha256, 255 * 32 + 1).unwrap_err();
        assert_eq!(err.dom_name(), "OperationError");
    }
}
