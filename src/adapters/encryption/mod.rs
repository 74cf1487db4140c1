//! Encryption adapter - field-level PII protection.

mod encrypting_contact_repository;
mod field_cipher;

pub use encrypting_contact_repository::EncryptingContactRepository;
pub use field_cipher::{CipherError, FieldCipher, KEY_HEX_LEN};
