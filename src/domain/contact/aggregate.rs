//! Contact aggregate - one inbound message to a provider.

use crate::domain::foundation::{
    ContactId, DomainError, PaymentId, ProviderId, Timestamp, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest message body accepted.
pub const MAX_MESSAGE_LENGTH: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Pending,
    Read,
    Replied,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Pending => "pending",
            ContactStatus::Read => "read",
            ContactStatus::Replied => "replied",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContactStatus::Pending),
            "read" => Ok(ContactStatus::Read),
            "replied" => Ok(ContactStatus::Replied),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown contact status '{}'", other),
            )),
        }
    }
}

/// Sender-supplied fields of a new contact.
#[derive(Debug, Clone)]
pub struct NewContact {
    pub user_id: Option<UserId>,
    pub provider_id: ProviderId,
    pub message: String,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_phone: Option<String>,
}

/// A message from a (possibly anonymous) user to a provider.
///
/// `sender_email` and `sender_phone` hold plaintext in memory; the storage
/// layer encrypts them on write and decrypts on read.
///
/// # Invariants
///
/// - `is_unlocked == false` implies `unlocked_at.is_none()`
/// - once unlocked, never locked again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub user_id: Option<UserId>,
    pub provider_id: ProviderId,
    pub message: String,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_phone: Option<String>,
    pub status: ContactStatus,
    pub is_unlocked: bool,
    pub unlocked_at: Option<Timestamp>,
    pub unlock_payment_id: Option<PaymentId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contact {
    /// Validates sender input and creates a locked, pending contact.
    pub fn create(new: NewContact, now: Timestamp) -> Result<Self, DomainError> {
        let message = new.message.trim().to_string();
        if message.is_empty() {
            return Err(ValidationError::empty_field("message").into());
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(DomainError::validation(
                "message",
                format!("Message must be at most {} characters", MAX_MESSAGE_LENGTH),
            ));
        }
        let sender_name = new.sender_name.trim().to_string();
        if sender_name.is_empty() {
            return Err(ValidationError::empty_field("senderName").into());
        }
        let sender_email = new.sender_email.trim().to_string();
        if !looks_like_email(&sender_email) {
            return Err(DomainError::validation("senderEmail", "Invalid email address"));
        }
        let sender_phone = new
            .sender_phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            id: ContactId::new(),
            user_id: new.user_id,
            provider_id: new.provider_id,
            message,
            sender_name,
            sender_email,
            sender_phone,
            status: ContactStatus::Pending,
            is_unlocked: false,
            unlocked_at: None,
            unlock_payment_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Unlocks the contact. Returns false if it already was.
    pub fn unlock(&mut self, payment_id: Option<PaymentId>, now: Timestamp) -> bool {
        if self.is_unlocked {
            return false;
        }
        self.is_unlocked = true;
        self.unlocked_at = Some(now);
        self.unlock_payment_id = payment_id;
        self.updated_at = now;
        true
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
