//! Contact domain - inbound messages and who may see their sender details.

mod aggregate;
mod masking;
mod unlocked;
mod viewer;

pub use aggregate::{Contact, ContactStatus, NewContact, MAX_MESSAGE_LENGTH};
pub use masking::{
    mask_email, message_preview, ContactView, FullContact, MaskedContact, PHONE_PLACEHOLDER,
    PREVIEW_LENGTH,
};
pub use unlocked::{UnlockType, UnlockedContact};
pub use viewer::{Viewer, ViewerRole};
