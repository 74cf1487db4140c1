//! Outbound email port.
//!
//! Callers treat delivery as fire-and-forget: a failed send is logged and
//! never fails the payment or subscription flow that triggered it.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("email transport failed: {0}")]
    Transport(String),

    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}
