//! Field encryption configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::adapters::encryption::KEY_HEX_LEN;

/// Keys for PII field encryption
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionConfig {
    /// AES-256 key, hex encoded
    pub key: String,

    /// Separate HMAC key for blind indexes; the encryption key is used when absent
    pub index_key: Option<String>,
}

impl EncryptionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::MissingRequired("ENCRYPTION__KEY"));
        }
        let is_key = |k: &str| k.len() == KEY_HEX_LEN && k.chars().all(|c| c.is_ascii_hexdigit());
        if !is_key(&self.key) {
            return Err(ValidationError::InvalidEncryptionKey(KEY_HEX_LEN));
        }
        if let Some(index_key) = &self.index_key {
            if !is_key(index_key) {
                return Err(ValidationError::InvalidEncryptionKey(KEY_HEX_LEN));
            }
        }
        Ok(())
    }
}
