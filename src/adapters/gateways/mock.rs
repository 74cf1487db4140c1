//! Scripted gateway for tests and local development.
//!
//! Speaks the internal vocabulary (`ACCEPTED`, `REFUSED`, ...) and accepts
//! webhooks as `{"transactionId", "status", "amount"}` JSON. When a secret
//! is set, the `x-mock-signature` header must carry the hex HMAC of the body.

use async_trait::async_trait;
use http::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use super::signature_matches;
use crate::domain::payment::{GatewayKind, GatewayNotification, NormalizedStatus, Payment};
use crate::ports::{CheckoutSession, GatewayError, Payer, PaymentGateway};

pub struct MockGateway {
    kind: GatewayKind,
    secret: Option<String>,
    fail_initiation: Mutex<Option<String>>,
    statuses: Mutex<HashMap<String, GatewayNotification>>,
    initiated: Mutex<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MockWebhook {
    transaction_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
}

impl MockGateway {
    pub fn new(kind: GatewayKind) -> Self {
        Self {
            kind,
            secret: None,
            fail_initiation: Mutex::new(None),
            statuses: Mutex::new(HashMap::new()),
            initiated: Mutex::new(Vec::new()),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Makes the next initiations fail with `message`.
    pub fn fail_initiation_with(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.fail_initiation.lock() {
            *slot = Some(message.into());
        }
    }

    /// Scripts what `check_status` reports for a transaction.
    pub fn set_status(&self, transaction_id: &str, raw_status: &str, amount: Option<i64>) {
        let mut notification = GatewayNotification::new(transaction_id);
        notification.raw_status = Some(raw_status.to_string());
        notification.amount = amount;
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(transaction_id.to_string(), notification);
        }
    }

    /// Transaction ids sent to `initiate`, in order.
    pub fn initiated(&self) -> Vec<String> {
        self.initiated.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    fn normalize_status(&self, raw_status: &str) -> Option<NormalizedStatus> {
        serde_json::from_value(Value::String(raw_status.trim().to_ascii_uppercase())).ok()
    }

    fn build_initiate_request(&self, payment: &Payment, _payer: &Payer) -> Result<Value, GatewayError> {
        Ok(json!({
            "transactionId": payment.transaction_id,
            "amount": payment.amount,
            "currency": payment.currency,
        }))
    }

    async fn initiate(&self, payment: &Payment, _payer: &Payer) -> Result<CheckoutSession, GatewayError> {
        if let Ok(mut initiated) = self.initiated.lock() {
            initiated.push(payment.transaction_id.clone());
        }
        let failure = self.fail_initiation.lock().ok().and_then(|f| f.clone());
        if let Some(message) = failure {
            return Err(GatewayError::network(message));
        }
        Ok(CheckoutSession {
            payment_url: format!("https://checkout.invalid/{}", payment.transaction_id),
            payment_token: Some(format!("tok_{}", payment.transaction_id)),
        })
    }

    async fn check_status(&self, payment: &Payment) -> Result<GatewayNotification, GatewayError> {
        let scripted = self
            .statuses
            .lock()
            .ok()
            .and_then(|s| s.get(&payment.transaction_id).cloned());
        Ok(scripted.unwrap_or_else(|| GatewayNotification::new(payment.transaction_id.clone())))
    }

    fn parse_webhook(&self, body: &[u8], headers: &HeaderMap) -> Result<GatewayNotification, GatewayError> {
        if let Some(secret) = &self.secret {
            let provided = headers
                .get("x-mock-signature")
                .and_then(|v| v.to_str().ok())
                .ok_or(GatewayError::InvalidSignature)?;
            if !signature_matches(secret.as_bytes(), body, provided) {
                return Err(GatewayError::InvalidSignature);
            }
        }

        let webhook: MockWebhook = serde_json::from_slice(body)
            .map_err(|e| GatewayError::parse(e.to_string()))?;
        let mut notification = GatewayNotification::new(webhook.transaction_id);
        notification.raw_status = webhook.status;
        notification.amount = webhook.amount;
        Ok(notification)
    }
}
