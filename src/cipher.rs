//! Request token cipher
//!
//! The provider expects the `x-token` payload in the OpenSSL "Salted__"
//! passphrase format that CryptoJS produces: an 8 byte salt, key and IV
//! derived with `EVP_BytesToKey` (MD5, one round), AES-256-CBC with PKCS#7
//! padding, and the whole thing base64 encoded.

use crate::error::{EkiwiError, Result};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine as _;
use md5::{Digest, Md5};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const SALTED_MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Keyed transform turning a request payload into an opaque token string
pub trait TokenCipher: Send + Sync {
    /// Encrypt `payload` with `key`; an empty key is an error
    fn encrypt(&self, payload: &[u8], key: &[u8]) -> Result<String>;
}

/// CryptoJS-compatible AES passphrase cipher
#[derive(Debug, Default, Clone, Copy)]
pub struct CryptoJsCipher;

impl CryptoJsCipher {
    pub fn new() -> Self {
        Self
    }

    /// Deterministic variant of [`TokenCipher::encrypt`] for a fixed salt
    pub fn encrypt_with_salt(
        &self,
        payload: &[u8],
        key: &[u8],
        salt: &[u8; SALT_LEN],
    ) -> Result<String> {
        ensure_key(key)?;
        let (aes_key, iv) = evp_bytes_to_key(key, salt);
        let encryptor = Aes256CbcEnc::new_from_slices(&aes_key, &iv)
            .map_err(|e| EkiwiError::cipher(format!("Invalid key material: {}", e)))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(payload);

        let mut out = Vec::with_capacity(SALTED_MAGIC.len() + SALT_LEN + ciphertext.len());
        out.extend_from_slice(SALTED_MAGIC);
        out.extend_from_slice(salt);
        out.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(out))
    }

    /// Invert [`CryptoJsCipher::encrypt_with_salt`]
    pub fn decrypt(&self, token: &str, key: &[u8]) -> Result<Vec<u8>> {
        ensure_key(key)?;
        let raw = base64::engine::general_purpose::STANDARD
            .decode(token.trim())
            .map_err(|e| EkiwiError::cipher(format!("Token is not base64: {}", e)))?;
        if raw.len() < SALTED_MAGIC.len() + SALT_LEN || &raw[..SALTED_MAGIC.len()] != SALTED_MAGIC
        {
            return Err(EkiwiError::cipher("Token is missing the Salted__ header"));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&raw[SALTED_MAGIC.len()..SALTED_MAGIC.len() + SALT_LEN]);
        let (aes_key, iv) = evp_bytes_to_key(key, &salt);
        let decryptor = Aes256CbcDec::new_from_slices(&aes_key, &iv)
            .map_err(|e| EkiwiError::cipher(format!("Invalid key material: {}", e)))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&raw[SALTED_MAGIC.len() + SALT_LEN..])
            .map_err(|_| EkiwiError::cipher("Bad padding; wrong key?"))
    }
}

impl TokenCipher for CryptoJsCipher {
    fn encrypt(&self, payload: &[u8], key: &[u8]) -> Result<String> {
        let salt: [u8; SALT_LEN] = rand::random();
        self.encrypt_with_salt(payload, key, &salt)
    }
}

fn ensure_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(EkiwiError::cipher("Cipher key must not be empty"));
    }
    Ok(())
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration
fn evp_bytes_to_key(passphrase: &[u8], salt: &[u8]) -> ([u8; KEY_LEN], [u8; IV_LEN]) {
    let mut material = Vec::with_capacity(KEY_LEN + IV_LEN + 16);
    let mut previous: Vec<u8> = Vec::new();
    while material.len() < KEY_LEN + IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(passphrase);
        hasher.update(salt);
        previous = hasher.finalize().to_vec();
        material.extend_from_slice(&previous);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    key.copy_from_slice(&material[..KEY_LEN]);
    iv.copy_from_slice(&material[KEY_LEN..KEY_LEN + IV_LEN]);
    (key, iv)
}

/// Hex MD5 digest, the form in which the login endpoint expects passwords
pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
