//! Masked and full renderings of a contact.
//!
//! The masked view must never carry more than the first character of the
//! email local part, and never any real phone digit.

use crate::domain::foundation::{ContactId, Timestamp};
use serde::Serialize;

use super::{Contact, ContactStatus};

/// Characters of the message shown before unlocking.
pub const PREVIEW_LENGTH: usize = 50;

/// Shown in place of any real phone number.
pub const PHONE_PLACEHOLDER: &str = "+*** *** *** ***";

const EMAIL_MASK_SUFFIX: &str = "***@***";

/// `john.doe@example.com` becomes `j***@***`.
pub fn mask_email(email: &str) -> String {
    match email.trim().chars().next() {
        Some(first) if first != '@' => format!("{}{}", first, EMAIL_MASK_SUFFIX),
        _ => EMAIL_MASK_SUFFIX.to_string(),
    }
}

/// First [`PREVIEW_LENGTH`] characters, with `...` when truncated.
pub fn message_preview(message: &str) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(PREVIEW_LENGTH).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedContact {
    pub id: ContactId,
    pub message_preview: String,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_phone: Option<String>,
    pub status: ContactStatus,
    pub unlock_price: i64,
    pub needs_unlock: bool,
    pub created_at: Timestamp,
}

impl MaskedContact {
    pub fn new(contact: &Contact, unlock_price: i64) -> Self {
        Self {
            id: contact.id,
            message_preview: message_preview(&contact.message),
            sender_name: contact.sender_name.clone(),
            sender_email: mask_email(&contact.sender_email),
            sender_phone: contact
                .sender_phone
                .as_ref()
                .map(|_| PHONE_PLACEHOLDER.to_string()),
            status: contact.status,
            unlock_price,
            needs_unlock: true,
            created_at: contact.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullContact {
    pub id: ContactId,
    pub message: String,
    pub sender_name: String,
    pub sender_email: String,
    pub sender_phone: Option<String>,
    pub status: ContactStatus,
    pub is_unlocked: bool,
    pub unlocked_at: Option<Timestamp>,
    pub needs_unlock: bool,
    pub created_at: Timestamp,
}

impl From<&Contact> for FullContact {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            message: contact.message.clone(),
            sender_name: contact.sender_name.clone(),
            sender_email: contact.sender_email.clone(),
            sender_phone: contact.sender_phone.clone(),
            status: contact.status,
            is_unlocked: contact.is_unlocked,
            unlocked_at: contact.unlocked_at,
            needs_unlock: false,
            created_at: contact.created_at,
        }
    }
}

/// What a viewer gets back for one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContactView {
    Full(FullContact),
    Masked(MaskedContact),
}

impl ContactView {
    pub fn is_masked(&self) -> bool {
        matches!(self, ContactView::Masked(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contact::NewContact;
    use crate::domain::foundation::{ProviderId, UserId};
    use proptest::prelude::*;

    fn contact_with(email: &str, phone: Option<&str>, message: &str) -> Contact {
        let mut contact = Contact::create(
            NewContact {
                user_id: Some(UserId::new()),
                provider_id: ProviderId::new(),
                message: "placeholder".to_string(),
                sender_name: "John".to_string(),
                sender_email: "a@b.co".to_string(),
                sender_phone: None,
            },
            Timestamp::now(),
        )
        .unwrap();
        contact.sender_email = email.to_string();
        contact.sender_phone = phone.map(str::to_string);
        contact.message = message.to_string();
        contact
    }

    #[test]
    fn masks_email_to_first_character() {
        assert_eq!(mask_email("john.doe@example.com"), "j***@***");
    }

    #[test]
    fn masks_empty_email_without_leaking() {
        assert_eq!(mask_email(""), "***@***");
        assert_eq!(mask_email("@example.com"), "***@***");
    }

    #[test]
    fn preview_truncates_long_messages() {
        let long = "x".repeat(80);
        let preview = message_preview(&long);

        assert_eq!(preview.len(), 53);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn preview_keeps_short_messages_intact() {
        assert_eq!(message_preview("Hello"), "Hello");
        assert_eq!(message_preview(&"y".repeat(50)), "y".repeat(50));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let message = "é".repeat(60);
        assert_eq!(message_preview(&message).chars().count(), 53);
    }

    #[test]
    fn masked_view_flags_unlock() {
        let contact = contact_with("john.doe@example.com", Some("+237 699 12 34 56"), "Hi");
        let masked = MaskedContact::new(&contact, 500);

        assert!(masked.needs_unlock);
        assert_eq!(masked.unlock_price, 500);
        assert_eq!(masked.sender_email, "j***@***");
        assert_eq!(masked.sender_phone.as_deref(), Some(PHONE_PLACEHOLDER));
    }

    #[test]
    fn masked_view_without_phone_has_no_phone() {
        let contact = contact_with("a@b.co", None, "Hi");
        assert!(MaskedContact::new(&contact, 500).sender_phone.is_none());
    }

    proptest! {
        #[test]
        fn masked_email_reveals_at_most_one_character(
            local in "[a-zA-Z0-9._%+-]{1,30}",
            domain in "[a-z0-9-]{1,20}\\.[a-z]{2,6}",
        ) {
            let email = format!("{}@{}", local, domain);
            let masked = mask_email(&email);
            let first = local.chars().next().unwrap();

            prop_assert_eq!(masked, format!("{}***@***", first));
        }

        #[test]
        fn masked_phone_is_always_the_placeholder(phone in "\\+?[0-9 ]{6,20}") {
            let contact = contact_with("a@b.co", Some(&phone), "Hi");
            let masked = MaskedContact::new(&contact, 500);

            prop_assert_eq!(masked.sender_phone.as_deref(), Some(PHONE_PLACEHOLDER));
        }

        #[test]
        fn preview_never_exceeds_limit(message in "\\PC{0,200}") {
            let preview = message_preview(&message);
            prop_assert!(preview.chars().count() <= PREVIEW_LENGTH + 3);
        }
    }
}
