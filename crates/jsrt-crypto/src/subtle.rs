//! The `crypto.subtle` operation surface.
//!
//! Algorithm names arrive as WebCrypto strings; key material crosses this
//! boundary as raw bytes or DER. The JavaScript wrapper owns the
//! `CryptoKey` object model and converts every [`CryptoError`] here into
//! a rejected promise named by [`CryptoError::dom_name`].

use crate::digest::{self, HashAlgorithm};
use crate::ec::{EcKeyPair, PublicEcKey};
use crate::error::{CryptoError, CryptoResult};
use crate::hmac;
use crate::kdf;
use crate::rsa::{PublicRsaKey, RsaKeyPair};
use crate::symmetric::{self, SymmetricParams};

/// `subtle.digest(algorithm, data)`.
pub fn subtle_digest(algorithm: &str, data: &[u8]) -> CryptoResult<Vec<u8>> {
    digest::digest(HashAlgorithm::parse(algorithm)?, data)
}

/// Parameters for `subtle.encrypt`/`subtle.decrypt` with an AES key.
pub struct AesCipherParams<'a> {
    pub algorithm: &'a str,
    pub key: &'a [u8],
    pub iv: &'a [u8],
    /// GCM only.
    pub additional_data: Option<&'a [u8]>,
    /// GCM tag length in bits; defaults to 128.
    pub tag_length_bits: Option<usize>,
    /// CTR counter width in bits; defaults to 64.
    pub counter_length_bits: Option<usize>,
}

fn symmetric_params(params: &AesCipherParams<'_>) -> CryptoResult<SymmetricParams> {
    match params.algorithm.to_ascii_uppercase().as_str() {
        "AES-CBC" => {
            let iv: [u8; 16] = params
                .iv
                .try_into()
                .map_err(|_| CryptoError::operation("AES-CBC IV must be 16 bytes"))?;
            Ok(SymmetricParams::Cbc {
                key: params.key.to_vec(),
                iv,
            })
        }
        "AES-GCM" => {
            let tag_bits = params.tag_length_bits.unwrap_or(128);
            if tag_bits % 8 != 0 {
                return Err(CryptoError::operation(format!(
                    "GCM tag length {tag_bits} bits"
                )));
            }
            Ok(SymmetricParams::Gcm {
                key: params.key.to_vec(),
                iv: params.iv.to_vec(),
                aad: params.additional_data.map(|aad| aad.to_vec()),
                tag_length: tag_bits / 8,
            })
        }
        "AES-CTR" => {
            let counter: [u8; 16] = params
                .iv
                .try_into()
                .map_err(|_| CryptoError::operation("AES-CTR counter must be 16 bytes"))?;
            Ok(SymmetricParams::Ctr {
                key: params.key.to_vec(),
                counter,
                counter_length_bits: params.counter_length_bits.unwrap_or(64),
            })
        }
        other => Err(CryptoError::not_supported(format!("cipher '{other}'"))),
    }
}

/// `subtle.encrypt` for the AES family.
pub fn subtle_aes_encrypt(params: &AesCipherParams<'_>, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    symmetric::aes_encrypt(&symmetric_params(params)?, plaintext)
}

/// `subtle.decrypt` for the AES family.
pub fn subtle_aes_decrypt(
    params: &AesCipherParams<'_>,
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    symmetric::aes_decrypt(&symmetric_params(params)?, ciphertext)
}

/// `subtle.generateKey` for AES: returns raw key bytes.
pub fn subtle_generate_aes_key(length_bits: usize) -> CryptoResult<Vec<u8>> {
    symmetric::generate_aes_key(length_bits)
}

/// `subtle.generateKey` for HMAC: random key of the hash block size.
pub fn subtle_generate_hmac_key(hash: &str) -> CryptoResult<Vec<u8>> {
    hmac::generate_key(HashAlgorithm::parse(hash)?)
}

/// `subtle.sign` with an HMAC key.
pub fn subtle_hmac_sign(hash: &str, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    hmac::sign(HashAlgorithm::parse(hash)?, key, data)
}

/// `subtle.verify` with an HMAC key.
pub fn subtle_hmac_verify(
    hash: &str,
    key: &[u8],
    signature: &[u8],
    data: &[u8],
) -> CryptoResult<bool> {
    hmac::verify(HashAlgorithm::parse(hash)?, key, signature, data)
}

/// Generated RSA keypair in its DER exchange forms.
pub struct GeneratedKeyPair {
    pub private_key_der: Vec<u8>,
    pub public_key_der: Vec<u8>,
}

/// `subtle.generateKey` for RSA-OAEP / RSASSA-PKCS1-v1_5.
pub fn subtle_generate_rsa_key(
    modulus_bits: usize,
    public_exponent: Option<u64>,
    hash: &str,
) -> CryptoResult<GeneratedKeyPair> {
    let pair = RsaKeyPair::generate(modulus_bits, public_exponent, HashAlgorithm::parse(hash)?)?;
    Ok(GeneratedKeyPair {
        private_key_der: pair.private_key_der()?,
        public_key_der: pair.public_key_der()?,
    })
}

/// `subtle.encrypt` with RSA-OAEP.
pub fn subtle_rsa_oaep_encrypt(
    public_spki_der: &[u8],
    hash: &str,
    label: Option<&str>,
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = PublicRsaKey::from_spki_der(public_spki_der, HashAlgorithm::parse(hash)?)?;
    key.oaep_encrypt(plaintext, label)
}

/// `subtle.decrypt` with RSA-OAEP.
pub fn subtle_rsa_oaep_decrypt(
    private_pkcs8_der: &[u8],
    hash: &str,
    label: Option<&str>,
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let pair = RsaKeyPair::from_pkcs8_der(private_pkcs8_der, HashAlgorithm::parse(hash)?)?;
    pair.oaep_decrypt(ciphertext, label)
}

/// `subtle.sign` with RSASSA-PKCS1-v1_5.
pub fn subtle_rsa_sign(
    private_pkcs8_der: &[u8],
    hash: &str,
    data: &[u8],
) -> CryptoResult<Vec<u8>> {
    let pair = RsaKeyPair::from_pkcs8_der(private_pkcs8_der, HashAlgorithm::parse(hash)?)?;
    pair.sign_pkcs1v15(data)
}

/// `subtle.verify` with RSASSA-PKCS1-v1_5.
pub fn subtle_rsa_verify(
    public_spki_der: &[u8],
    hash: &str,
    signature: &[u8],
    data: &[u8],
) -> CryptoResult<bool> {
    let key = PublicRsaKey::from_spki_der(public_spki_der, HashAlgorithm::parse(hash)?)?;
    key.verify_pkcs1v15(signature, data)
}

/// `subtle.generateKey` for ECDSA/ECDH over P-256.
pub fn subtle_generate_ec_key(curve: &str) -> CryptoResult<GeneratedKeyPair> {
    if !curve.eq_ignore_ascii_case("P-256") {
        return Err(CryptoError::not_supported(format!("curve '{curve}'")));
    }
    let pair = EcKeyPair::generate()?;
    Ok(GeneratedKeyPair {
        private_key_der: pair.private_key_der()?,
        public_key_der: pair.public_key_der()?,
    })
}

/// `subtle.sign` with ECDSA P-256 / SHA-256.
pub fn subtle_ecdsa_sign(private_pkcs8_der: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    EcKeyPair::from_pkcs8_der(private_pkcs8_der)?.sign(data)
}

/// `subtle.verify` with ECDSA P-256 / SHA-256.
pub fn subtle_ecdsa_verify(
    public_spki_der: &[u8],
    signature: &[u8],
    data: &[u8],
) -> CryptoResult<bool> {
    PublicEcKey::from_spki_der(public_spki_der)?.verify(signature, data)
}

/// `subtle.deriveBits` with PBKDF2.
pub fn subtle_pbkdf2_derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    hash: &str,
    length_bits: usize,
) -> CryptoResult<Vec<u8>> {
    if length_bits % 8 != 0 {
        return Err(CryptoError::operation("derived length must be byte-aligned"));
    }
    kdf::pbkdf2_derive(
        password,
        salt,
        iterations,
        HashAlgorithm::parse(hash)?,
        length_bits / 8,
    )
}

/// `subtle.deriveBits` with HKDF.
pub fn subtle_hkdf_derive(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: Option<&[u8]>,
    hash: &str,
    length_bits: usize,
) -> CryptoResult<Vec<u8>> {
    if length_bits % 8 != 0 {
        return Err(CryptoError::operation("derived length must be byte-aligned"));
    }
    kdf::hkdf_derive(
        ikm,
        salt,
        info,
        HashAlgorithm::parse(hash)?,
        length_bits / 8,
    )
}

/// `subtle.deriveBits` with ECDH.
pub fn subtle_ecdh_derive(
    private_pkcs8_der: &[u8],
    peer_spki_der: &[u8],
) -> CryptoResult<Vec<u8>> {
    EcKeyPair::from_pkcs8_der(private_pkcs8_der)?.derive_shared_secret(peer_spki_der)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtle_digest_names() {
        let out = subtle_digest("SHA-256", b"abc").unwrap();
        assert_eq!(out.len(), 32);
        let err = subtle_digest("MD5", b"abc").unwrap_err();
        assert_eq!(err.dom_name(), "NotSupportedError");
    }

    #[test]
    fn test_subtle_gcm_scenario() {
        // Key = 16 random bytes, IV = 12 random bytes, AAD = "hdr".
        let key = subtle_generate_aes_key(128).unwrap();
        let mut iv = [0u8; 12];
        crate::random::get_random_values(&mut iv).unwrap();

        let params = AesCipherParams {
            algorithm: "AES-GCM",
            key: &key,
            iv: &iv,
            additional_data: Some(b"hdr"),
            tag_length_bits: None,
            counter_length_bits: None,
        };
        let ciphertext = subtle_aes_encrypt(&params, b"hello").unwrap();
        assert_eq!(subtle_aes_decrypt(&params, &ciphertext).unwrap(), b"hello");

        let wrong_aad = AesCipherParams {
            additional_data: Some(b"HDR"),
            ..params
        };
        let err = subtle_aes_decrypt(&wrong_aad, &ciphertext).unwrap_err();
        assert_eq!(err.dom_name(), "OperationError");
    }

    #[test]
    fn test_subtle_rsa_der_flow() {
        let pair = subtle_generate_rsa_key(1024, None, "SHA-256").unwrap();
        let ciphertext =
            subtle_rsa_oaep_encrypt(&pair.public_key_der, "SHA-256", None, b"m").unwrap();
        let plaintext =
            subtle_rsa_oaep_decrypt(&pair.private_key_der, "SHA-256", None, &ciphertext).unwrap();
        assert_eq!(plaintext, b"m");

        let signature = subtle_rsa_sign(&pair.private_key_der, "SHA-256", b"data").unwrap();
        assert!(subtle_rsa_verify(&pair.public_key_der, "SHA-256", &signature, b"data").unwrap());
    }

    #[test]
    fn test_subtle_ec_flow() {
        let alice = subtle_generate_ec_key("P-256").unwrap();
        let bob = subtle_generate_ec_key("P-256").unwrap();

        let signature = subtle_ecdsa_sign(&alice.private_key_der, b"payload").unwrap();
        assert!(subtle_ecdsa_verify(&alice.public_key_der, &signature, b"payload").unwrap());

        let a = subtle_ecdh_derive(&alice.private_key_der, &bob.public_key_der).unwrap();
        let b = subtle_ecdh_derive(&bob.private_key_der, &alice.public_key_der).unwrap();
        assert_eq!(a, b);

        assert!(subtle_generate_ec_key("P-384").is_err());
    }

    #[test]
    fn test_subtle_derive_bits() {
        let derived = subtle_pbkdf2_derive(b"pw", b"salt", 1000, "SHA-256", 256).unwrap();
        assert_eq!(derived.len(), 32);
        let hkdf = subtle_hkdf_derive(b"ikm", None, Some(b"info"), "SHA-256", 128).unwrap();
        assert_eq!(hkdf.len(), 16);
        assert!(subtle_pbkdf2_derive(b"pw", b"salt", 1000, "SHA-256", 12).is_err());
    }
}
