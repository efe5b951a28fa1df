//! Statically linked backend over the bundled providers.
//!
//! Digests come from ring; the AES modes from the RustCrypto cipher
//! stack. GCM tag truncation is handled by instantiating the cipher with
//! the requested tag size, so a truncated tag is verified exactly as the
//! full one would be.

use super::{BackendKind, CryptoBackend, check_aes_key};
use crate::digest::HashAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::SymmetricParams;
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::generic_array::typenum::Unsigned;
use aes_gcm::{AeadCore, AeadInPlace, AesGcm, KeyInit};
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use rand_core::{OsRng, RngCore};
use ring::digest as ring_digest;

pub struct StaticBackend;

impl StaticBackend {
    pub fn new() -> Self {
        StaticBackend
    }
}

impl Default for StaticBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn ring_algorithm(algorithm: HashAlgorithm) -> &'static ring_digest::Algorithm {
    match algorithm {
        HashAlgorithm::Sha1 => &ring_digest::SHA1_FOR_LEGACY_USE_ONLY,
        HashAlgorithm::Sha256 => &ring_digest::SHA256,
        HashAlgorithm::Sha384 => &ring_digest::SHA384,
        HashAlgorithm::Sha512 => &ring_digest::SHA512,
    }
}

// --- CBC ---

fn cbc_encrypt_with<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockEncryptMut + cipher::BlockCipher + cipher::KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptoError::operation("CBC cipher setup"))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt_with<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockDecryptMut + cipher::BlockCipher + cipher::KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| CryptoError::operation("CBC cipher setup"))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::operation("AES-CBC decryption failed"))
}

// --- CTR ---

fn ctr_apply_with<C>(key: &[u8], counter: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: StreamCipher + KeyIvInit,
{
    let mut cipher = C::new_from_slices(key, counter)
        .map_err(|_| CryptoError::operation("CTR cipher setup"))?;
    let mut buffer = data.to_vec();
    cipher.apply_keystream(&mut buffer);
    Ok(buffer)
}

fn ctr_apply(
    key: &[u8],
    counter: &[u8; 16],
    counter_bits: usize,
    data: &[u8],
) -> CryptoResult<Vec<u8>> {
    match (counter_bits, key.len()) {
        (32, 16) => ctr_apply_with::<ctr::Ctr32BE<Aes128>>(key, counter, data),
        (32, 24) => ctr_apply_with::<ctr::Ctr32BE<Aes192>>(key, counter, data),
        (32, 32) => ctr_apply_with::<ctr::Ctr32BE<Aes256>>(key, counter, data),
        (64, 16) => ctr_apply_with::<ctr::Ctr64BE<Aes128>>(key, counter, data),
        (64, 24) => ctr_apply_with::<ctr::Ctr64BE<Aes192>>(key, counter, data),
        (64, 32) => ctr_apply_with::<ctr::Ctr64BE<Aes256>>(key, counter, data),
        (128, 16) => ctr_apply_with::<ctr::Ctr128BE<Aes128>>(key, counter, data),
        (128, 24) => ctr_apply_with::<ctr::Ctr128BE<Aes192>>(key, counter, data),
        (128, 32) => ctr_apply_with::<ctr::Ctr128BE<Aes256>>(key, counter, data),
        (bits, _) => Err(CryptoError::not_supported(format!(
            "CTR counter width {bits}"
        ))),
    }
}

// --- GCM ---

fn gcm_encrypt_with<C>(key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: KeyInit + AeadInPlace,
{
    let cipher =
        C::new_from_slice(key).map_err(|_| CryptoError::operation("GCM cipher setup"))?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), aad, &mut buffer)
        .map_err(|_| CryptoError::operation("AES-GCM encryption failed"))?;
    buffer.extend_from_slice(&tag);
    Ok(buffer)
}

fn gcm_decrypt_with<C>(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>>
where
    C: KeyInit + AeadInPlace,
{
    let tag_len = <C as AeadCore>::TagSize::to_usize();
    if ciphertext.len() < tag_len {
        return Err(CryptoError::operation("ciphertext shorter than GCM tag"));
    }
    let (body, tag) = ciphertext.split_at(ciphertext.len() - tag_len);
    let cipher =
        C::new_from_slice(key).map_err(|_| CryptoError::operation("GCM cipher setup"))?;
    let mut buffer = body.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(iv),
            aad,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::operation("AES-GCM decryption failed"))?;
    Ok(buffer)
}

/// Dispatch over (key length, IV length, tag length). The bundled
/// provider handles the 12- and 16-byte IV forms; other IV lengths need
/// the dynamic provider.
macro_rules! gcm_dispatch {
    ($func:ident, $key:expr, $iv:expr, $tag_len:expr, $aad:expr, $data:expr) => {{
        use aes_gcm::aead::consts::{U12, U13, U14, U15, U16};
        match ($key.len(), $iv.len(), $tag_len) {
            (16, 12, 12) => $func::<AesGcm<Aes128, U12, U12>>($key, $iv, $aad, $data),
            (16, 12, 13) => $func::<AesGcm<Aes128, U12, U13>>($key, $iv, $aad, $data),
            (16, 12, 14) => $func::<AesGcm<Aes128, U12, U14>>($key, $iv, $aad, $data),
            (16, 12, 15) => $func::<AesGcm<Aes128, U12, U15>>($key, $iv, $aad, $data),
            (16, 12, 16) => $func::<AesGcm<Aes128, U12, U16>>($key, $iv, $aad, $data),
            (16, 16, 12) => $func::<AesGcm<Aes128, U16, U12>>($key, $iv, $aad, $data),
            (16, 16, 13) => $func::<AesGcm<Aes128, U16, U13>>($key, $iv, $aad, $data),
            (16, 16, 14) => $func::<AesGcm<Aes128, U16, U14>>($key, $iv, $aad, $data),
            (16, 16, 15) => $func::<AesGcm<Aes128, U16, U15>>($key, $iv, $aad, $data),
            (16, 16, 16) => $func::<AesGcm<Aes128, U16, U16>>($key, $iv, $aad, $data),
            (24, 12, 12) => $func::<AesGcm<Aes192, U12, U12>>($key, $iv, $aad, $data),
            (24, 12, 13) => $func::<AesGcm<Aes192, U12, U13>>($key, $iv, $aad, $data),
            (24, 12, 14) => $func::<AesGcm<Aes192, U12, U14>>($key, $iv, $aad, $data),
            (24, 12, 15) => $func::<AesGcm<Aes192, U12, U15>>($key, $iv, $aad, $data),
            (24, 12, 16) => $func::<AesGcm<Aes192, U12, U16>>($key, $iv, $aad, $data),
            (24, 16, 12) => $func::<AesGcm<Aes192, U16, U12>>($key, $iv, $aad, $data),
            (24, 16, 13) => $func::<AesGcm<Aes192, U16, U13>>($key, $iv, $aad, $data),
            (24, 16, 14) => $func::<AesGcm<Aes192, U16, U14>>($key, $iv, $aad, $data),
            (24, 16, 15) => $func::<AesGcm<Aes192, U16, U15>>($key, $iv, $aad, $data),
            (24, 16, 16) => $func::<AesGcm<Aes192, U16, U16>>($key, $iv, $aad, $data),
            (32, 12, 12) => $func::<AesGcm<Aes256, U12, U12>>($key, $iv, $aad, $data),
            (32, 12, 13) => $func::<AesGcm<Aes256, U12, U13>>($key, $iv, $aad, $data),
            (32, 12, 14) => $func::<AesGcm<Aes256, U12, U14>>($key, $iv, $aad, $data),
            (32, 12, 15) => $func::<AesGcm<Aes256, U12, U15>>($key, $iv, $aad, $data),
            (32, 12, 16) => $func::<AesGcm<Aes256, U12, U16>>($key, $iv, $aad, $data),
            (32, 16, 12) => $func::<AesGcm<Aes256, U16, U12>>($key, $iv, $aad, $data),
            (32, 16, 13) => $func::<AesGcm<Aes256, U16, U13>>($key, $iv, $aad, $data),
            (32, 16, 14) => $func::<AesGcm<Aes256, U16, U14>>($key, $iv, $aad, $data),
            (32, 16, 15) => $func::<AesGcm<Aes256, U16, U15>>($key, $iv, $aad, $data),
            (32, 16, 16) => $func::<AesGcm<Aes256, U16, U16>>($key, $iv, $aad, $data),
            (_, iv_len, _) => Err(CryptoError::not_supported(format!(
                "AES-GCM with {iv_len}-byte IV on the static backend"
            ))),
        }
    }};
}

impl CryptoBackend for StaticBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Static
    }

    fn version(&self) -> String {
        "jsrt-crypto static provider (ring + RustCrypto)".to_string()
    }

    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let out = ring_digest::digest(ring_algorithm(algorithm), data);
        Ok(out.as_ref().to_vec())
    }

    fn generate_aes_key(&self, length_bits: usize) -> CryptoResult<Vec<u8>> {
        let mut key = vec![0u8; length_bits / 8];
        self.random_bytes(&mut key)?;
        Ok(key)
    }

    fn aes_encrypt(&self, params: &SymmetricParams, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        check_aes_key(params.key())?;
        match params {
            SymmetricParams::Cbc { key, iv } => match key.len() {
                16 => cbc_encrypt_with::<Aes128>(key, iv, plaintext),
                24 => cbc_encrypt_with::<Aes192>(key, iv, plaintext),
                _ => cbc_encrypt_with::<Aes256>(key, iv, plaintext),
            },
            SymmetricParams::Gcm {
                key,
                iv,
                aad,
                tag_length,
            } => {
                let aad = aad.as_deref().unwrap_or(&[]);
                gcm_dispatch!(gcm_encrypt_with, key, iv, *tag_length, aad, plaintext)
            }
            SymmetricParams::Ctr {
                key,
                counter,
                counter_length_bits,
            } => ctr_apply(key, counter, *counter_length_bits, plaintext),
        }
    }

    fn aes_decrypt(&self, params: &SymmetricParams, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        check_aes_key(params.key())?;
        match params {
            SymmetricParams::Cbc { key, iv } => match key.len() {
                16 => cbc_decrypt_with::<Aes128>(key, iv, ciphertext),
                24 => cbc_decrypt_with::<Aes192>(key, iv, ciphertext),
                _ => cbc_decrypt_with::<Aes256>(key, iv, ciphertext),
            },
            SymmetricParams::Gcm {
                key,
                iv,
                aad,
                tag_length,
            } => {
                let aad = aad.as_deref().unwrap_or(&[]);
                gcm_dispatch!(gcm_decrypt_with, key, iv, *tag_length, aad, ciphertext)
            }
            SymmetricParams::Ctr {
                key,
                counter,
                counter_length_bits,
            } => ctr_apply(key, counter, *counter_length_bits, ciphertext),
        }
    }

    fn random_bytes(&self, buf: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|err| CryptoError::operation(format!("OS random source: {err}")))
    }

    fn random_uuid(&self) -> CryptoResult<String> {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes)?;
        Ok(uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string())
    }
}
