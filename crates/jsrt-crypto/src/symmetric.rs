//! Symmetric cipher parameters and the AES engine entry points.
//!
//! AES-CBC, AES-GCM, and AES-CTR share one control flow: validate
//! parameters, hand the buffer to the installed backend, and (for GCM)
//! carry the authentication tag appended to the ciphertext. AAD is
//! authenticated but never part of the output.

use crate::backend;
use crate::error::{CryptoError, CryptoResult};

/// AES key lengths in bytes mapped to AES-128/192/256.
pub const AES_KEY_LENGTHS: &[usize] = &[16, 24, 32];

/// GCM tag lengths accepted on the wire, in bytes.
pub const GCM_TAG_LENGTHS: &[usize] = &[12, 13, 14, 15, 16];

/// Mode-discriminated cipher parameters.
#[derive(Clone)]
pub enum SymmetricParams {
    /// CBC with PKCS#7 padding; IV is exactly 16 bytes.
    Cbc { key: Vec<u8>, iv: [u8; 16] },
    /// GCM; IV is recommended 12 bytes. Ciphertext carries the tag as its
    /// trailing `tag_length` bytes.
    Gcm {
        key: Vec<u8>,
        iv: Vec<u8>,
        aad: Option<Vec<u8>>,
        tag_length: usize,
    },
    /// CTR with a 16-byte counter block; output length equals input
    /// length.
    Ctr {
        key: Vec<u8>,
        counter: [u8; 16],
        counter_length_bits: usize,
    },
}

impl SymmetricParams {
    pub fn key(&self) -> &[u8] {
        match self {
            SymmetricParams::Cbc { key, .. }
            | SymmetricParams::Gcm { key, .. }
            | SymmetricParams::Ctr { key, .. } => key,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            SymmetricParams::Cbc { .. } => "AES-CBC",
            SymmetricParams::Gcm { .. } => "AES-GCM",
            SymmetricParams::Ctr { .. } => "AES-CTR",
        }
    }

    /// Validate key length and mode-specific constraints.
    pub fn validate(&self) -> CryptoResult<()> {
        if !AES_KEY_LENGTHS.contains(&self.key().len()) {
            return Err(CryptoError::operation(format!(
                "invalid AES key length {}",
                self.key().len()
            )));
        }
        match self {
            SymmetricParams::Cbc { .. } => Ok(()),
            SymmetricParams::Gcm { iv, tag_length, .. } => {
                if iv.is_empty() {
                    return Err(CryptoError::operation("empty GCM IV"));
                }
                if !GCM_TAG_LENGTHS.contains(tag_length) {
                    return Err(CryptoError::operation(format!(
                        "invalid GCM tag length {tag_length}"
                    )));
                }
                Ok(())
            }
            SymmetricParams::Ctr {
                counter_length_bits,
                ..
            } => {
                if !matches!(counter_length_bits, 32 | 64 | 128) {
                    return Err(CryptoError::not_supported(format!(
                        "CTR counter width {counter_length_bits}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Generate an AES key through the backend's random source.
pub fn generate_aes_key(length_bits: usize) -> CryptoResult<Vec<u8>> {
    if !matches!(length_bits, 128 | 192 | 256) {
        return Err(CryptoError::operation(format!(
            "invalid AES key length {length_bits} bits"
        )));
    }
    backend::active()?.generate_aes_key(length_bits)
}

/// Encrypt with the installed backend. For GCM the returned buffer is
/// `ciphertext || tag`.
pub fn aes_encrypt(params: &SymmetricParams, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    params.validate()?;
    backend::active()?.aes_encrypt(params, plaintext)
}

/// Decrypt with the installed backend. For GCM the trailing tag bytes are
/// split off and verified; a tag mismatch is indistinguishable from any
/// other failure.
pub fn aes_decrypt(params: &SymmetricParams, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    params.validate()?;
    backend::active()?.aes_decrypt(params, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_bytes(n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        crate::random::fill_random(&mut buf).unwrap();
        buf
    }

    fn cbc_params(key: &[u8]) -> SymmetricParams {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&random_bytes(16));
        SymmetricParams::Cbc {
            key: key.to_vec(),
            iv,
        }
    }

    #[test]
    fn test_cbc_round_trip_all_key_sizes() {
        for key_len in AES_KEY_LENGTHS {
            let key = random_bytes(*key_len);
            let params = cbc_params(&key);
            let plaintext = b"the quick brown fox jumps over the lazy dog";
            let ciphertext = aes_encrypt(&params, plaintext).unwrap();
            // PKCS#7: ciphertext includes a padding block.
            assert!(ciphertext.len() > plaintext.len());
            assert_eq!(ciphertext.len() % 16, 0);
            let decrypted = aes_decrypt(&params, &ciphertext).unwrap();
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn test_cbc_empty_plaintext_pads_to_one_block() {
        let key = random_bytes(16);
        let params = cbc_params(&key);
        let ciphertext = aes_encrypt(&params, b"").unwrap();
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(aes_decrypt(&params, &ciphertext).unwrap(), b"");
    }

    #[test]
    fn test_gcm_round_trip_with_aad() {
        let key = random_bytes(16);
        let iv = random_bytes(12);
        let params = SymmetricParams::Gcm {
            key: key.clone(),
            iv: iv.clone(),
            aad: Some(b"hdr".to_vec()),
            tag_length: 16,
        };
        let ciphertext = aes_encrypt(&params, b"hello").unwrap();
        assert_eq!(ciphertext.len(), 5 + 16);
        assert_eq!(aes_decrypt(&params, &ciphertext).unwrap(), b"hello");

        // Different AAD must fail.
        let bad_aad = SymmetricParams::Gcm {
            key,
            iv,
            aad: Some(b"HDR".to_vec()),
            tag_length: 16,
        };
        assert!(aes_decrypt(&bad_aad, &ciphertext).is_err());
    }

    #[test]
    fn test_gcm_tampered_tag_fails() {
        let key = random_bytes(32);
        let iv = random_bytes(12);
        let params = SymmetricParams::Gcm {
            key,
            iv,
            aad: None,
            tag_length: 16,
        };
        let mut ciphertext = aes_encrypt(&params, b"payload").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        let err = aes_decrypt(&params, &ciphertext).unwrap_err();
        assert_eq!(err.dom_name(), "OperationError");
    }

    #[test]
    fn test_gcm_truncated_tag_lengths() {
        for tag_length in GCM_TAG_LENGTHS {
            let params = SymmetricParams::Gcm {
                key: random_bytes(16),
                iv: random_bytes(12),
                aad: None,
                tag_length: *tag_length,
            };
            let ciphertext = aes_encrypt(&params, b"x").unwrap();
            assert_eq!(ciphertext.len(), 1 + tag_length);
            assert_eq!(aes_decrypt(&params, &ciphertext).unwrap(), b"x");
        }
    }

    #[test]
    fn test_gcm_ciphertext_shorter_than_tag_fails() {
        let params = SymmetricParams::Gcm {
            key: random_bytes(16),
            iv: random_bytes(12),
            aad: None,
            tag_length: 16,
        };
        assert!(aes_decrypt(&params, b"short").is_err());
    }

    #[test]
    fn test_ctr_round_trip_length_preserving() {
        let key = random_bytes(32);
        let mut counter = [0u8; 16];
        counter.copy_from_slice(&random_bytes(16));
        let params = SymmetricParams::Ctr {
            key,
            counter,
            counter_length_bits: 64,
        };
        let plaintext = b"stream mode has no padding";
        let ciphertext = aes_encrypt(&params, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());
        assert_ne!(&ciphertext[..], &plaintext[..]);
        assert_eq!(aes_decrypt(&params, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let params = SymmetricParams::Cbc {
            key: vec![0u8; 15],
            iv: [0u8; 16],
        };
        assert!(aes_encrypt(&params, b"data").is_err());
        assert!(generate_aes_key(100).is_err());
    }

    #[test]
    fn test_generate_aes_key_lengths() {
        for (bits, bytes) in [(128, 16), (192, 24), (256, 32)] {
            let key = generate_aes_key(bits).unwrap();
            assert_eq!(key.len(), bytes);
        }
        let a = generate_aes_key(256).unwrap();
        let b = generate_aes_key(256).unwrap();
        assert_ne!(a, b);
    }
}
