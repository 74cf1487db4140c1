//! Field-level encryption for PII at rest.
//!
//! AES-256-GCM with a 128-bit random nonce and a 128-bit tag. Ciphertext is
//! stored as `nonce:tag:ciphertext`, each part lower-case hex, so that
//! [`FieldCipher::is_encrypted`] can tell ciphertext from plaintext by shape
//! alone.
//!
//! Decryption never fails loudly: a value that is not ciphertext-shaped, or
//! whose tag does not authenticate, comes back unchanged and a warning is
//! logged. Callers cannot distinguish "never encrypted" from "corrupted".

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type Aes256Gcm16 = AesGcm<Aes256, U16>;
type HmacSha256 = Hmac<Sha256>;

/// Hex length of a 16-byte nonce or tag.
const PART_HEX_LEN: usize = 32;

/// Hex length of a 32-byte key.
pub const KEY_HEX_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption key must be 64 hex characters")]
    InvalidKey,

    #[error("value is not in nonce:tag:ciphertext format")]
    Malformed,

    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("decrypted bytes are not UTF-8")]
    Encoding,
}

/// Reversible, authenticated encryption of single string fields.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm16,
    index_key: Vec<u8>,
}

impl FieldCipher {
    /// Builds a cipher from a 64-hex-character key.
    ///
    /// The blind index is keyed with `index_key` when given, otherwise with
    /// the encryption key.
    pub fn from_hex(key: &SecretString, index_key: Option<&SecretString>) -> Result<Self, CipherError> {
        let key_bytes = decode_key(key.expose_secret())?;
        let index_key = match index_key {
            Some(k) => decode_key(k.expose_secret())?,
            None => key_bytes.clone(),
        };
        let cipher = Aes256Gcm16::new_from_slice(&key_bytes).map_err(|_| CipherError::InvalidKey)?;
        Ok(Self { cipher, index_key })
    }

    pub fn encrypt(&self, plaintext: &str) -> String {
        let nonce = Aes256Gcm16::generate_nonce(&mut OsRng);
        let mut buffer = plaintext.as_bytes().to_vec();
        // Only fails for messages beyond the GCM length limit (~64 GiB).
        match self.cipher.encrypt_in_place_detached(&nonce, b"", &mut buffer) {
            Ok(tag) => format!(
                "{}:{}:{}",
                hex::encode(nonce),
                hex::encode(tag),
                hex::encode(buffer)
            ),
            Err(_) => {
                tracing::error!(length = plaintext.len(), "field encryption failed");
                plaintext.to_string()
            }
        }
    }

    /// Decrypts, or returns `value` unchanged if it cannot.
    pub fn decrypt(&self, value: &str) -> String {
        match self.try_decrypt(value) {
            Ok(plaintext) => plaintext,
            Err(CipherError::Malformed) => value.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "could not decrypt field, returning it as stored");
                value.to_string()
            }
        }
    }

    /// Decrypts, reporting why it could not.
    pub fn try_decrypt(&self, value: &str) -> Result<String, CipherError> {
        if !Self::is_encrypted(value) {
            return Err(CipherError::Malformed);
        }
        let mut parts = value.split(':');
        let (Some(nonce_hex), Some(tag_hex), Some(ct_hex)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CipherError::Malformed);
        };

        let nonce_bytes = hex::decode(nonce_hex).map_err(|_| CipherError::Malformed)?;
        let tag_bytes = hex::decode(tag_hex).map_err(|_| CipherError::Malformed)?;
        let mut buffer = hex::decode(ct_hex).map_err(|_| CipherError::Malformed)?;

        let nonce = Nonce::<U16>::from_slice(&nonce_bytes);
        let tag = Tag::<U16>::from_slice(&tag_bytes);
        self.cipher
            .decrypt_in_place_detached(nonce, b"", &mut buffer, tag)
            .map_err(|_| CipherError::Authentication)?;

        String::from_utf8(buffer).map_err(|_| CipherError::Encoding)
    }

    /// Encrypts unless the value already has ciphertext shape.
    pub fn encrypt_if_needed(&self, value: &str) -> String {
        if Self::is_encrypted(value) {
            value.to_string()
        } else {
            self.encrypt(value)
        }
    }

    /// Shape check: `<32 hex>:<32 hex>:<even-length hex>`.
    pub fn is_encrypted(value: &str) -> bool {
        let parts: Vec<&str> = value.split(':').collect();
        match parts.as_slice() {
            [nonce, tag, ct] => {
                nonce.len() == PART_HEX_LEN
                    && tag.len() == PART_HEX_LEN
                    && ct.len() % 2 == 0
                    && [nonce, tag, ct].iter().all(|p| is_hex(p))
            }
            _ => false,
        }
    }

    /// Deterministic keyed hash for equality search.
    ///
    /// Trims and lower-cases first, so lookups ignore case and surrounding
    /// whitespace.
    pub fn blind_index(&self, plaintext: &str) -> String {
        let normalized = plaintext.trim().to_lowercase();
        // HMAC accepts keys of any length.
        let mut mac = match <HmacSha256 as Mac>::new_from_slice(&self.index_key) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(normalized.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

fn decode_key(hex_key: &str) -> Result<Vec<u8>, CipherError> {
    let trimmed = hex_key.trim();
    if trimmed.len() != KEY_HEX_LEN {
        return Err(CipherError::InvalidKey);
    }
    hex::decode(trimmed).map_err(|_| CipherError::InvalidKey)
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}
