//! P-256 elliptic-curve engine: ECDSA signatures and ECDH derivation.
//!
//! Signatures use the raw `r || s` 64-byte form of the Web platform.
//! Keys exchange as DER (PKCS#8 private, SPKI public) like the RSA
//! engine.

use crate::error::{CryptoError, CryptoResult};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as P256Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use p256::{PublicKey, SecretKey, ecdh};
use rand_core::OsRng;

/// A P-256 keypair handle.
pub struct EcKeyPair {
    secret: SecretKey,
}

impl EcKeyPair {
    pub fn generate() -> CryptoResult<Self> {
        Ok(EcKeyPair {
            secret: SecretKey::random(&mut OsRng),
        })
    }

    pub fn from_pkcs8_der(der: &[u8]) -> CryptoResult<Self> {
        let secret = SecretKey::from_pkcs8_der(der)
            .map_err(|err| CryptoError::operation(format!("EC PKCS#8 import: {err}")))?;
        Ok(EcKeyPair { secret })
    }

    pub fn private_key_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self
            .secret
            .to_pkcs8_der()
            .map_err(|err| CryptoError::operation(format!("EC PKCS#8 export: {err}")))?
            .as_bytes()
            .to_vec())
    }

    pub fn public_key_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self
            .secret
            .public_key()
            .to_public_key_der()
            .map_err(|err| CryptoError::operation(format!("EC SPKI export: {err}")))?
            .as_bytes()
            .to_vec())
    }

    /// ECDSA-SHA256 signature in raw `r || s` form.
    pub fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let signing_key = SigningKey::from(&self.secret);
        let signature: P256Signature = signing_key.sign(data);
        Ok(signature.to_bytes().to_vec())
    }

    /// ECDH shared secret against a peer's SPKI public key.
    pub fn derive_shared_secret(&self, peer_spki_der: &[u8]) -> CryptoResult<Vec<u8>> {
        let peer = PublicKey::from_public_key_der(peer_spki_der)
            .map_err(|err| CryptoError::operation(format!("peer key import: {err}")))?;
        let shared = ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        Ok(shared.raw_secret_bytes().to_vec())
    }

    pub fn public(&self) -> CryptoResult<PublicEcKey> {
        Ok(PublicEcKey {
            key: self.secret.public_key(),
        })
    }
}

/// The public half alone.
pub struct PublicEcKey {
    key: PublicKey,
}

impl PublicEcKey {
    pub fn from_spki_der(der: &[u8]) -> CryptoResult<Self> {
        let key = PublicKey::from_public_key_der(der)
            .map_err(|err| CryptoError::operation(format!("EC SPKI import: {err}")))?;
        Ok(PublicEcKey { key })
    }

    /// Verify a raw `r || s` ECDSA-SHA256 signature.
    pub fn verify(&self, signature: &[u8], data: &[u8]) -> CryptoResult<bool> {
        let signature = P256Signature::from_slice(signature)
            .map_err(|_| CryptoError::operation("malformed ECDSA signature"))?;
        let verifying_key = VerifyingKey::from(&self.key);
        Ok(verifying_key.verify(data, &signature).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let pair = EcKeyPair::generate().unwrap();
        let signature = pair.sign(b"signed payload").unwrap();
        assert_eq!(signature.len(), 64);

        let public = pair.public().unwrap();
        assert!(public.verify(&signature, b"signed payload").unwrap());
        assert!(!public.verify(&signature, b"other payload").unwrap());
    }

    #[test]
    fn test_der_round_trip() {
        let pair = EcKeyPair::generate().unwrap();
        let private_der = pair.private_key_der().unwrap();
        let public_der = pair.public_key_der().unwrap();

        let reimported = EcKeyPair::from_pkcs8_der(&private_der).unwrap();
        let signature = reimported.sign(b"data").unwrap();
        let public = PublicEcKey::from_spki_der(&public_der).unwrap();
        assert!(public.verify(&signature, b"data").unwrap());
    }

    #[test]
    fn test_ecdh_shared_secret_agreement() {
        let alice = EcKeyPair::generate().unwrap();
        let bob = EcKeyPair::generate().unwrap();

        let alice_shared = alice
            .derive_shared_secret(&bob.public_key_der().unwrap())
            .unwrap();
        let bob_shared = bob
            .derive_shared_secret(&alice.public_key_der().unwrap())
            .unwrap();
        assert_eq!(alice_shared, bob_shared);
        assert_eq!(alice_shared.len(), 32);

        let carol = EcKeyPair::generate().unwrap();
        let carol_shared = carol
            .derive_shared_secret(&bob.public_key_der().unwrap())
            .unwrap();
        assert_ne!(alice_shared, carol_shared);
    }
}
