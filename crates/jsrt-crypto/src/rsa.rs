//! RSA key generation, OAEP encryption, and PKCS#1 v1.5 signatures.
//!
//! Key material crosses the API boundary as DER only: PKCS#8 for private
//! halves, SPKI for public halves. Engine-side handles own their key and
//! release it on drop.

use crate::digest::{self, HashAlgorithm};
use crate::error::{CryptoError, CryptoResult};
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

/// Accepted modulus lengths in bits.
pub const MIN_MODULUS_BITS: usize = 1024;
pub const MAX_MODULUS_BITS: usize = 4096;

/// Default public exponent (F4).
pub const DEFAULT_PUBLIC_EXPONENT: u64 = 65537;

/// An engine-owned RSA keypair with its associated signature hash.
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    modulus_bits: usize,
    public_exponent: u64,
    hash: HashAlgorithm,
}

impl RsaKeyPair {
    /// Generate a keypair. `public_exponent` defaults to 65537.
    pub fn generate(
        modulus_bits: usize,
        public_exponent: Option<u64>,
        hash: HashAlgorithm,
    ) -> CryptoResult<Self> {
        if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&modulus_bits) {
            return Err(CryptoError::operation(format!(
                "modulus length {modulus_bits} outside {MIN_MODULUS_BITS}..={MAX_MODULUS_BITS}"
            )));
        }
        let public_exponent = public_exponent.unwrap_or(DEFAULT_PUBLIC_EXPONENT);
        let exponent = BigUint::from(public_exponent);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, modulus_bits, &exponent)
            .map_err(|err| CryptoError::operation(format!("RSA key generation: {err}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(RsaKeyPair {
            private,
            public,
            modulus_bits,
            public_exponent,
            hash,
        })
    }

    /// Reconstruct a keypair from PKCS#8 DER.
    pub fn from_pkcs8_der(der: &[u8], hash: HashAlgorithm) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|err| CryptoError::operation(format!("PKCS#8 import: {err}")))?;
        let modulus_bits = private.n().bits();
        let public_exponent = private
            .e()
            .to_bytes_be()
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        let public = RsaPublicKey::from(&private);
        Ok(RsaKeyPair {
            private,
            public,
            modulus_bits,
            public_exponent,
            hash,
        })
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    pub fn public_exponent(&self) -> u64 {
        self.public_exponent
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// PKCS#8 DER of the private half.
    pub fn private_key_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self
            .private
            .to_pkcs8_der()
            .map_err(|err| CryptoError::operation(format!("PKCS#8 export: {err}")))?
            .as_bytes()
            .to_vec())
    }

    /// SPKI DER of the public half.
    pub fn public_key_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self
            .public
            .to_public_key_der()
            .map_err(|err| CryptoError::operation(format!("SPKI export: {err}")))?
            .as_bytes()
            .to_vec())
    }

    /// OAEP decryption with this pair's hash.
    pub fn oaep_decrypt(&self, ciphertext: &[u8], label: Option<&str>) -> CryptoResult<Vec<u8>> {
        let padding = oaep_padding(self.hash, label);
        self.private
            .decrypt(padding, ciphertext)
            .map_err(|_| CryptoError::operation("RSA-OAEP decryption failed"))
    }

    /// PKCS#1 v1.5 signature over the digest of `data`.
    pub fn sign_pkcs1v15(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let digest = digest::digest(self.hash, data)?;
        self.private
            .sign(pkcs1v15_padding(self.hash), &digest)
            .map_err(|err| CryptoError::operation(format!("RSA signing: {err}")))
    }

    pub fn public(&self) -> PublicRsaKey {
        PublicRsaKey {
            key: self.public.clone(),
            hash: self.hash,
        }
    }
}

/// The public half alone, as imported from SPKI DER.
pub struct PublicRsaKey {
    key: RsaPublicKey,
    hash: HashAlgorithm,
}

impl PublicRsaKey {
    pub fn from_spki_der(der: &[u8], hash: HashAlgorithm) -> CryptoResult<Self> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|err| CryptoError::operation(format!("SPKI import: {err}")))?;
        Ok(PublicRsaKey { key, hash })
    }

    /// OAEP encryption. Plaintext is bounded by the OAEP maximum
    /// (modulus bytes - 2 * hash length - 2).
    pub fn oaep_encrypt(&self, plaintext: &[u8], label: Option<&str>) -> CryptoResult<Vec<u8>> {
        let padding = oaep_padding(self.hash, label);
        self.key
            .encrypt(&mut OsRng, padding, plaintext)
            .map_err(|_| CryptoError::operation("RSA-OAEP encryption failed"))
    }

    /// Verify a PKCS#1 v1.5 signature over the digest of `data`.
    pub fn verify_pkcs1v15(&self, signature: &[u8], data: &[u8]) -> CryptoResult<bool> {
        let digest = digest::digest(self.hash, data)?;
        Ok(self
            .key
            .verify(pkcs1v15_padding(self.hash), &digest, signature)
            .is_ok())
    }

    /// OAEP plaintext capacity in bytes.
    pub fn max_oaep_len(&self) -> usize {
        let modulus_len = self.key.size();
        modulus_len.saturating_sub(2 * self.hash.output_len() + 2)
    }
}

fn oaep_padding(hash: HashAlgorithm, label: Option<&str>) -> Oaep {
    let label = label.map(|l| l.to_string());
    match (hash, label) {
        (HashAlgorithm::Sha1, None) => Oaep::new::<Sha1>(),
        (HashAlgorithm::Sha1, Some(l)) => Oaep::new_with_label::<Sha1, _>(l),
        (HashAlgorithm::Sha256, None) => Oaep::new::<Sha256>(),
        (HashAlgorithm::Sha256, Some(l)) => Oaep::new_with_label::<Sha256, _>(l),
        (HashAlgorithm::Sha384, None) => Oaep::new::<Sha384>(),
        (HashAlgorithm::Sha384, Some(l)) => Oaep::new_with_label::<Sha384, _>(l),
        (HashAlgorithm::Sha512, None) => Oaep::new::<Sha512>(),
        (HashAlgorithm::Sha512, Some(l)) => Oaep::new_with_label::<Sha512, _>(l),
    }
}

fn pkcs1v15_padding(hash: HashAlgorithm) -> Pkcs1v15Sign {
    match hash {
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}
