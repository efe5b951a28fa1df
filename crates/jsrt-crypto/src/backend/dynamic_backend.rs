//! Dynamically loaded backend.
//!
//! Locates the platform OpenSSL `libcrypto` by trying a per-OS list of
//! library names, then resolves every required `EVP_*`/`RAND_bytes`
//! symbol by name at initialization. The operation table's entries are
//! thin wrappers calling through those symbols; if the library or any
//! symbol is missing, initialization fails and the caller falls back to
//! the static table.

use super::{BackendKind, CryptoBackend, check_aes_key};
use crate::digest::HashAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::SymmetricParams;
use libloading::Library;
use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_void};
use tracing::debug;

#[cfg(target_os = "linux")]
const LIBRARY_CANDIDATES: &[&str] = &["libcrypto.so.3", "libcrypto.so.1.1", "libcrypto.so"];

#[cfg(target_os = "macos")]
const LIBRARY_CANDIDATES: &[&str] = &[
    "libcrypto.3.dylib",
    "libcrypto.1.1.dylib",
    "libcrypto.dylib",
    "/opt/homebrew/opt/openssl@3/lib/libcrypto.3.dylib",
    "/usr/local/opt/openssl@3/lib/libcrypto.3.dylib",
];

#[cfg(target_os = "windows")]
const LIBRARY_CANDIDATES: &[&str] = &[
    "libcrypto-3-x64.dll",
    "libcrypto-3.dll",
    "libcrypto-1_1-x64.dll",
    "libeay32.dll",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const LIBRARY_CANDIDATES: &[&str] = &["libcrypto.so"];

// EVP_CIPHER_CTX_ctrl commands used for GCM.
const EVP_CTRL_GCM_SET_IVLEN: c_int = 0x9;
const EVP_CTRL_GCM_GET_TAG: c_int = 0x10;
const EVP_CTRL_GCM_SET_TAG: c_int = 0x11;

type RandBytesFn = unsafe extern "C" fn(*mut u8, c_int) -> c_int;
type EvpDigestFn = unsafe extern "C" fn(
    *const c_void,
    usize,
    *mut u8,
    *mut c_uint,
    *const c_void,
    *mut c_void,
) -> c_int;
type GetByNameFn = unsafe extern "C" fn(*const c_char) -> *const c_void;
type CtxNewFn = unsafe extern "C" fn() -> *mut c_void;
type CtxFreeFn = unsafe extern "C" fn(*mut c_void);
type CipherInitFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_void,
    *mut c_void,
    *const u8,
    *const u8,
) -> c_int;
type CipherUpdateFn =
    unsafe extern "C" fn(*mut c_void, *mut u8, *mut c_int, *const u8, c_int) -> c_int;
type CipherFinalFn = unsafe extern "C" fn(*mut c_void, *mut u8, *mut c_int) -> c_int;
type CtxCtrlFn = unsafe extern "C" fn(*mut c_void, c_int, c_int, *mut c_void) -> c_int;
type VersionFn = unsafe extern "C" fn(c_int) -> *const c_char;

/// Resolved symbol table. The `Library` must outlive every pointer.
struct OpensslApi {
    _lib: Library,
    rand_bytes: RandBytesFn,
    evp_digest: EvpDigestFn,
    evp_get_digestbyname: GetByNameFn,
    evp_get_cipherbyname: GetByNameFn,
    evp_cipher_ctx_new: CtxNewFn,
    evp_cipher_ctx_free: CtxFreeFn,
    evp_encrypt_init: CipherInitFn,
    evp_encrypt_update: CipherUpdateFn,
    evp_encrypt_final: CipherFinalFn,
    evp_decrypt_init: CipherInitFn,
    evp_decrypt_update: CipherUpdateFn,
    evp_decrypt_final: CipherFinalFn,
    evp_cipher_ctx_ctrl: CtxCtrlFn,
    openssl_version: Option<VersionFn>,
}

unsafe fn resolve<T: Copy>(lib: &Library, name: &[u8]) -> CryptoResult<T> {
    unsafe {
        lib.get::<T>(name)
            .map(|symbol| *symbol)
            .map_err(|err| {
                CryptoError::not_supported(format!(
                    "symbol {} unavailable: {err}",
                    String::from_utf8_lossy(&name[..name.len() - 1])
                ))
            })
    }
}

impl OpensslApi {
    fn load() -> CryptoResult<Self> {
        let mut last_error = None;
        for candidate in LIBRARY_CANDIDATES {
            match unsafe { Library::new(candidate) } {
                Ok(lib) => {
                    debug!(library = candidate, "loaded crypto provider");
                    return Self::resolve_all(lib);
                }
                Err(err) => last_error = Some(err.to_string()),
            }
        }
        Err(CryptoError::not_supported(format!(
            "no crypto library found: {}",
            last_error.unwrap_or_else(|| "no candidates tried".to_string())
        )))
    }

    fn resolve_all(lib: Library) -> CryptoResult<Self> {
        unsafe {
            let api = OpensslApi {
                rand_bytes: resolve(&lib, b"RAND_bytes\0")?,
                evp_digest: resolve(&lib, b"EVP_Digest\0")?,
                evp_get_digestbyname: resolve(&lib, b"EVP_get_digestbyname\0")?,
                evp_get_cipherbyname: resolve(&lib, b"EVP_get_cipherbyname\0")?,
                evp_cipher_ctx_new: resolve(&lib, b"EVP_CIPHER_CTX_new\0")?,
                evp_cipher_ctx_free: resolve(&lib, b"EVP_CIPHER_CTX_free\0")?,
                evp_encrypt_init: resolve(&lib, b"EVP_EncryptInit_ex\0")?,
                evp_encrypt_update: resolve(&lib, b"EVP_EncryptUpdate\0")?,
                evp_encrypt_final: resolve(&lib, b"EVP_EncryptFinal_ex\0")?,
                evp_decrypt_init: resolve(&lib, b"EVP_DecryptInit_ex\0")?,
                evp_decrypt_update: resolve(&lib, b"EVP_DecryptUpdate\0")?,
                evp_decrypt_final: resolve(&lib, b"EVP_DecryptFinal_ex\0")?,
                evp_cipher_ctx_ctrl: resolve(&lib, b"EVP_CIPHER_CTX_ctrl\0")?,
                openssl_version: resolve(&lib, b"OpenSSL_version\0").ok(),
                _lib: lib,
            };
            Ok(api)
        }
    }

    fn digest_by_name(&self, name: &str) -> CryptoResult<*const c_void> {
        let cname = CString::new(name).expect("digest name");
        let md = unsafe { (self.evp_get_digestbyname)(cname.as_ptr()) };
        if md.is_null() {
            return Err(CryptoError::not_supported(format!("digest {name}")));
        }
        Ok(md)
    }

    fn cipher_by_name(&self, name: &str) -> CryptoResult<*const c_void> {
        let cname = CString::new(name).expect("cipher name");
        let cipher = unsafe { (self.evp_get_cipherbyname)(cname.as_ptr()) };
        if cipher.is_null() {
            return Err(CryptoError::not_supported(format!("cipher {name}")));
        }
        Ok(cipher)
    }
}

/// Owned `EVP_CIPHER_CTX`; freed on every exit path.
struct CipherCtx<'a> {
    api: &'a OpensslApi,
    ptr: *mut c_void,
}

impl<'a> CipherCtx<'a> {
    fn new(api: &'a OpensslApi) -> CryptoResult<Self> {
        let ptr = unsafe { (api.evp_cipher_ctx_new)() };
        if ptr.is_null() {
            return Err(CryptoError::operation("EVP_CIPHER_CTX_new"));
        }
        Ok(CipherCtx { api, ptr })
    }
}

impl Drop for CipherCtx<'_> {
    fn drop(&mut self) {
        unsafe { (self.api.evp_cipher_ctx_free)(self.ptr) };
    }
}

fn cipher_name(mode: &SymmetricParams) -> CryptoResult<String> {
    let bits = mode.key().len() * 8;
    let suffix = match mode {
        SymmetricParams::Cbc { .. } => "cbc",
        SymmetricParams::Gcm { .. } => "gcm",
        SymmetricParams::Ctr { .. } => "ctr",
    };
    Ok(format!("aes-{bits}-{suffix}"))
}

pub struct DynamicBackend {
    api: OpensslApi,
}

// The symbol table is immutable after load and OpenSSL's EVP entry
// points are thread-safe.
unsafe impl Send for DynamicBackend {}
unsafe impl Sync for DynamicBackend {}

impl DynamicBackend {
    /// Locate the provider library and resolve the full symbol table.
    pub fn load() -> CryptoResult<Self> {
        Ok(DynamicBackend {
            api: OpensslApi::load()?,
        })
    }

    fn encrypt_inner(&self, params: &SymmetricParams, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let api = &self.api;
        let cipher = api.cipher_by_name(&cipher_name(params)?)?;
        let ctx = CipherCtx::new(api)?;

        let failure = || CryptoError::operation("AES encryption failed");

        unsafe {
            let (key, iv): (&[u8], &[u8]) = match params {
                SymmetricParams::Cbc { key, iv } => (key, iv),
                SymmetricParams::Ctr { key, counter, .. } => (key, counter),
                SymmetricParams::Gcm { key, iv, .. } => (key, iv),
            };

            if let SymmetricParams::Gcm { iv, .. } = params {
                // Configure the IV length before the keyed init.
                if (api.evp_encrypt_init)(
                    ctx.ptr,
                    cipher,
                    std::ptr::null_mut(),
                    std::ptr::null(),
                    std::ptr::null(),
                ) != 1
                {
                    return Err(failure());
                }
                if (api.evp_cipher_ctx_ctrl)(
                    ctx.ptr,
                    EVP_CTRL_GCM_SET_IVLEN,
                    iv.len() as c_int,
                    std::ptr::null_mut(),
                ) != 1
                {
                    return Err(failure());
                }
                if (api.evp_encrypt_init)(
                    ctx.ptr,
                    std::ptr::null(),
                    std::ptr::null_mut(),
                    key.as_ptr(),
                    iv.as_ptr(),
                ) != 1
                {
                    return Err(failure());
                }
            } else if (api.evp_encrypt_init)(
                ctx.ptr,
                cipher,
                std::ptr::null_mut(),
                key.as_ptr(),
                iv.as_ptr(),
            ) != 1
            {
                return Err(failure());
            }

            // AAD is fed before the plaintext and never appended.
            if let SymmetricParams::Gcm { aad: Some(aad), .. } = params {
                let mut written: c_int = 0;
                if (api.evp_encrypt_update)(
                    ctx.ptr,
                    std::ptr::null_mut(),
                    &mut written,
                    aad.as_ptr(),
                    aad.len() as c_int,
                ) != 1
                {
                    return Err(failure());
                }
            }

            let mut out = vec![0u8; plaintext.len() + 16];
            let mut total = 0usize;
            if !plaintext.is_empty() {
                let mut out_len: c_int = 0;
                if (api.evp_encrypt_update)(
                    ctx.ptr,
                    out.as_mut_ptr(),
                    &mut out_len,
                    plaintext.as_ptr(),
                    plaintext.len() as c_int,
                ) != 1
                {
                    return Err(failure());
                }
                total = out_len as usize;
            }

            let mut final_len: c_int = 0;
            if (api.evp_encrypt_final)(ctx.ptr, out.as_mut_ptr().add(total), &mut final_len) != 1 {
                return Err(failure());
            }
            total += final_len as usize;
            out.truncate(total);

            if let SymmetricParams::Gcm { tag_length, .. } = params {
                let mut tag = vec![0u8; *tag_length];
                if (api.evp_cipher_ctx_ctrl)(
                    ctx.ptr,
                    EVP_CTRL_GCM_GET_TAG,
                    *tag_length as c_int,
                    tag.as_mut_ptr() as *mut c_void,
                ) != 1
                {
                    return Err(failure());
                }
                out.extend_from_slice(&tag);
            }

            Ok(out)
        }
    }

    fn decrypt_inner(&self, params: &SymmetricParams, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        let api = &self.api;
        let cipher = api.cipher_by_name(&cipher_name(params)?)?;
        let ctx = CipherCtx::new(api)?;

        // A failed tag comparison is indistinguishable from any other
        // decryption failure.
        let failure = || CryptoError::operation("AES decryption failed");

        let (body, tag): (&[u8], Option<Vec<u8>>) = match params {
            SymmetricParams::Gcm { tag_length, .. } => {
                if ciphertext.len() < *tag_length {
                    return Err(failure());
                }
                let (body, tag) = ciphertext.split_at(ciphertext.len() - tag_length);
                (body, Some(tag.to_vec()))
            }
            _ => (ciphertext, None),
        };

        unsafe {
            let (key, iv): (&[u8], &[u8]) = match params {
                SymmetricParams::Cbc { key, iv } => (key, iv),
                SymmetricParams::Ctr { key, counter, .. } => (key, counter),
                SymmetricParams::Gcm { key, iv, .. } => (key, iv),
            };

            if let SymmetricParams::Gcm { iv, .. } = params {
                if (api.evp_decrypt_init)(
                    ctx.ptr,
                    cipher,
                    std::ptr::null_mut(),
                    std::ptr::null(),
                    std::ptr::null(),
                ) != 1
                {
                    return Err(failure());
                }
                if (api.evp_cipher_ctx_ctrl)(
                    ctx.ptr,
                    EVP_CTRL_GCM_SET_IVLEN,
                    iv.len() as c_int,
                    std::ptr::null_mut(),
                ) != 1
                {
                    return Err(failure());
                }
                if (api.evp_decrypt_init)(
                    ctx.ptr,
                    std::ptr::null(),
                    std::ptr::null_mut(),
                    key.as_ptr(),
                    iv.as_ptr(),
                ) != 1
                {
                    return Err(failure());
                }
            } else if (api.evp_decrypt_init)(
                ctx.ptr,
                cipher,
                std::ptr::null_mut(),
                key.as_ptr(),
                iv.as_ptr(),
            ) != 1
            {
                return Err(failure());
            }

            if let SymmetricParams::Gcm { aad: Some(aad), .. } = params {
                let mut written: c_int = 0;
                if (api.evp_decrypt_update)(
                    ctx.ptr,
                    std::ptr::null_mut(),
                    &mut written,
                    aad.as_ptr(),
                    aad.len() as c_int,
                ) != 1
                {
                    return Err(failure());
                }
            }

            let mut out = vec![0u8; body.len() + 16];
            let mut total = 0usize;
            if !body.is_empty() {
                let mut out_len: c_int = 0;
                if (api.evp_decrypt_update)(
                    ctx.ptr,
                    out.as_mut_ptr(),
                    &mut out_len,
                    body.as_ptr(),
                    body.len() as c_int,
                ) != 1
                {
                    return Err(failure());
                }
                total = out_len as usize;
            }

            if let Some(tag) = &tag {
                let mut tag_buf = tag.clone();
                if (api.evp_cipher_ctx_ctrl)(
                    ctx.ptr,
                    EVP_CTRL_GCM_SET_TAG,
                    tag_buf.len() as c_int,
                    tag_buf.as_mut_ptr() as *mut c_void,
                ) != 1
                {
                    return Err(failure());
                }
            }

            let mut final_len: c_int = 0;
            if (api.evp_decrypt_final)(ctx.ptr, out.as_mut_ptr().add(total), &mut final_len) != 1 {
                return Err(failure());
            }
            total += final_len as usize;
            out.truncate(total);
            Ok(out)
        }
    }
}

impl CryptoBackend for DynamicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dynamic
    }

    fn version(&self) -> String {
        match self.api.openssl_version {
            Some(version) => {
                let raw = unsafe { (version)(0) };
                if raw.is_null() {
                    "OpenSSL (unknown version)".to_string()
                } else {
                    unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned()
                }
            }
            None => "OpenSSL (unknown version)".to_string(),
        }
    }

    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let md = self.api.digest_by_name(algorithm.openssl_name())?;
        let mut out = vec![0u8; algorithm.output_len()];
        let mut out_len: c_uint = 0;
        let ok = unsafe {
            (self.api.evp_digest)(
                data.as_ptr() as *const c_void,
                data.len(),
                out.as_mut_ptr(),
                &mut out_len,
                md,
                std::ptr::null_mut(),
            )
        };
        if ok != 1 || out_len as usize != out.len() {
            return Err(CryptoError::operation("EVP_Digest failed"));
        }
        Ok(out)
    }

    fn generate_aes_key(&self, length_bits: usize) -> CryptoResult<Vec<u8>> {
        let mut key = vec![0u8; length_bits / 8];
        self.random_bytes(&mut key)?;
        Ok(key)
    }

    fn aes_encrypt(&self, params: &SymmetricParams, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        check_aes_key(params.key())?;
        self.encrypt_inner(params, plaintext)
    }

    fn aes_decrypt(&self, params: &SymmetricParams, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        check_aes_key(params.key())?;
        self.decrypt_inner(params, ciphertext)
    }

    fn random_bytes(&self, buf: &mut [u8]) -> CryptoResult<()> {
        let ok = unsafe { (self.api.rand_bytes)(buf.as_mut_ptr(), buf.len() as c_int) };
        if ok != 1 {
            return Err(CryptoError::operation("RAND_bytes failed"));
        }
        Ok(())
    }

    fn random_uuid(&self) -> CryptoResult<String> {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes)?;
        Ok(uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run only where a platform OpenSSL is present; loading failure
    // is itself the tested contract otherwise.

    #[test]
    fn test_load_or_clean_failure() {
        match DynamicBackend::load() {
            Ok(backend) => {
                let out = backend.digest(HashAlgorithm::Sha256, b"abc").unwrap();
                assert_eq!(
                    hex::encode(out),
                    "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
                );
            }
            Err(err) => {
                assert_eq!(err.dom_name(), "NotSupportedError");
            }
        }
    }

    #[test]
    fn test_dynamic_matches_static_gcm() {
        let Ok(dynamic) = DynamicBackend::load() else {
            return;
        };
        let static_backend = super::super::StaticBackend::new();
        let params = SymmetricParams::Gcm {
            key: vec![1u8; 16],
            iv: vec![2u8; 12],
            aad: Some(b"hdr".to_vec()),
            tag_length: 16,
        };
        let sealed = dynamic.aes_encrypt(&params, b"hello").unwrap();
        assert_eq!(static_backend.aes_decrypt(&params, &sealed).unwrap(), b"hello");

        let sealed_static = static_backend.aes_encrypt(&params, b"hello").unwrap();
        assert_eq!(dynamic.aes_decrypt(&params, &sealed_static).unwrap(), b"hello");
        assert_eq!(sealed, sealed_static);
    }

    #[test]
    fn test_dynamic_matches_static_cbc() {
        let Ok(dynamic) = DynamicBackend::load() else {
            return;
        };
        let static_backend = super::super::StaticBackend::new();
        let params = SymmetricParams::Cbc {
            key: vec![3u8; 32],
            iv: [4u8; 16],
        };
        let sealed = dynamic.aes_encrypt(&params, b"block cipher text").unwrap();
        assert_eq!(
            static_backend.aes_decrypt(&params, &sealed).unwrap(),
            b"block cipher text"
        );
    }
}
