use async_trait::async_trait;
use std::sync::Mutex;

use crate::ports::{EmailMessage, NotificationError, NotificationSender};

/// Logs and keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingNotificationSender {
    sent: Mutex<Vec<EmailMessage>>,
    failure: Mutex<Option<String>>,
}

impl RecordingNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, oldest first.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Makes every following send fail until [`Self::recover`].
    pub fn fail_with(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(reason.into());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        if let Some(reason) = self.failure.lock().ok().and_then(|f| f.clone()) {
            return Err(NotificationError::Transport(reason));
        }

        tracing::info!(subject = %message.subject, "Email recorded");
        self.sent
            .lock()
            .map_err(|_| NotificationError::Transport("recorder lock poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
