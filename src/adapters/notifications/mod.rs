//! Outbound email adapters.
//!
//! - `ResendEmailSender` - Resend HTTP API
//! - `RecordingNotificationSender` - keeps messages in memory; used by
//!   tests and by local runs without an API key

mod recording;
mod resend;

pub use recording::RecordingNotificationSender;
pub use resend::{ResendConfig, ResendEmailSender};
