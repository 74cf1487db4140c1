//! NotchPay gateway adapter.
//!
//! Webhooks carry `{event, data: {reference, status, ...}}` and are signed
//! with `x-notch-signature`, the hex HMAC-SHA256 of the raw body keyed with
//! the account hash key.

use async_trait::async_trait;
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{non_empty, parse_amount, parse_datetime, signature_matches};
use crate::domain::payment::{GatewayKind, GatewayNotification, NormalizedStatus, Payment};
use crate::ports::{CheckoutSession, GatewayError, Payer, PaymentGateway};

const SIGNATURE_HEADER: &str = "x-notch-signature";

#[derive(Clone)]
pub struct NotchPayConfig {
    public_key: SecretString,
    hash_key: SecretString,
    base_url: String,
    callback_url: String,
    timeout: Duration,
}

impl NotchPayConfig {
    pub fn new(public_key: SecretString, hash_key: SecretString) -> Self {
        Self {
            public_key,
            hash_key,
            base_url: "https://api.notchpay.co".to_string(),
            callback_url: String::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct NotchPayGateway {
    config: NotchPayConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(default)]
    event: String,
    data: Value,
}

impl NotchPayGateway {
    pub fn new(config: NotchPayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(e.to_string()))?;
        Ok(Self { config, http_client })
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, GatewayError> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::parse(format!("NotchPay returned HTTP {}: {}", status, e)))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string();
            return Err(GatewayError::rejected(status.as_u16().to_string(), message));
        }
        Ok(body)
    }

    /// Transaction object to notification. Prefers our own reference over
    /// NotchPay's.
    fn notification_from_transaction(
        transaction: &Value,
        fallback_status: Option<String>,
    ) -> Result<GatewayNotification, GatewayError> {
        let text = |key: &str| non_empty(transaction.get(key).and_then(Value::as_str));
        let transaction_id = text("merchant_reference")
            .or_else(|| text("reference"))
            .ok_or_else(|| GatewayError::parse("NotchPay payload without reference"))?;

        Ok(GatewayNotification {
            transaction_id,
            raw_status: text("status").or(fallback_status),
            amount: transaction.get("amount").and_then(parse_amount),
            currency: text("currency"),
            payment_method: text("payment_method").or_else(|| text("channel")),
            operator_id: text("trxref").or_else(|| text("reference")),
            paid_at: text("completed_at").as_deref().and_then(parse_datetime),
            fund_availability_date: None,
            error_message: text("failure_reason").or_else(|| text("message")),
        })
    }
}

#[async_trait]
impl PaymentGateway for NotchPayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::NotchPay
    }

    fn normalize_status(&self, raw_status: &str) -> Option<NormalizedStatus> {
        match raw_status.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" => Some(NormalizedStatus::Accepted),
            "failed" | "rejected" => Some(NormalizedStatus::Refused),
            "pending" | "processing" => Some(NormalizedStatus::WaitingCustomer),
            "canceled" | "cancelled" | "abandoned" => Some(NormalizedStatus::Cancelled),
            "expired" => Some(NormalizedStatus::Expired),
            _ => None,
        }
    }

    fn build_initiate_request(&self, payment: &Payment, payer: &Payer) -> Result<Value, GatewayError> {
        let email = payer
            .email
            .clone()
            .ok_or_else(|| GatewayError::parse("NotchPay requires a payer email"))?;

        Ok(json!({
            "amount": payment.amount,
            "currency": payment.currency,
            "reference": payment.transaction_id,
            "email": email,
            "phone": payer.phone,
            "name": payer.name,
            "description": payment.description,
            "callback": self.config.callback_url,
        }))
    }

    async fn initiate(&self, payment: &Payment, payer: &Payer) -> Result<CheckoutSession, GatewayError> {
        let body = self.build_initiate_request(payment, payer)?;
        let response = self
            .http_client
            .post(format!("{}/payments/initialize", self.config.base_url))
            .header("Authorization", self.config.public_key.expose_secret())
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;
        let body = Self::read_json(response).await?;

        let payment_url = non_empty(body.get("authorization_url").and_then(Value::as_str))
            .ok_or_else(|| GatewayError::parse("NotchPay response without authorization_url"))?;
        let payment_token = body
            .get("transaction")
            .and_then(|t| t.get("reference"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(CheckoutSession {
            payment_url,
            payment_token,
        })
    }

    async fn check_status(&self, payment: &Payment) -> Result<GatewayNotification, GatewayError> {
        let reference = payment
            .payment_token
            .as_deref()
            .unwrap_or(&payment.transaction_id);
        let response = self
            .http_client
            .get(format!("{}/payments/{}", self.config.base_url, reference))
            .header("Authorization", self.config.public_key.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;
        let body = Self::read_json(response).await?;

        let transaction = body
            .get("transaction")
            .ok_or_else(|| GatewayError::parse("NotchPay response without transaction"))?;
        let mut notification = Self::notification_from_transaction(transaction, None)?;
        notification.transaction_id = payment.transaction_id.clone();
        Ok(notification)
    }

    fn parse_webhook(&self, body: &[u8], headers: &HeaderMap) -> Result<GatewayNotification, GatewayError> {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(GatewayError::InvalidSignature)?;
        if !signature_matches(self.config.hash_key.expose_secret().as_bytes(), body, signature) {
            tracing::warn!("NotchPay webhook signature mismatch");
            return Err(GatewayError::InvalidSignature);
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|e| GatewayError::parse(format!("invalid NotchPay webhook: {}", e)))?;
        // `payment.complete` carries its outcome in the event name.
        let event_status = envelope
            .event
            .strip_prefix("payment.")
            .map(str::to_string);

        Self::notification_from_transaction(&envelope.data, event_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::hmac_hex;
    use http::HeaderValue;

    const HASH_KEY: &str = "notch-hash";

    fn gateway() -> NotchPayGateway {
        NotchPayGateway::new(NotchPayConfig::new(
            SecretString::new("pk_test".to_string()),
            SecretString::new(HASH_KEY.to_string()),
        ))
        .unwrap()
    }

    fn signed(body: &Value) -> (Vec<u8>, HeaderMap) {
        let bytes = serde_json::to_vec(body).unwrap();
        let sig = hmac_hex(HASH_KEY.as_bytes(), &bytes).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sig).unwrap());
        (bytes, headers)
    }

    #[test]
    fn maps_vendor_statuses() {
        let g = gateway();
        assert_eq!(g.normalize_status("complete"), Some(NormalizedStatus::Accepted));
        assert_eq!(g.normalize_status("failed"), Some(NormalizedStatus::Refused));
        assert_eq!(g.normalize_status("processing"), Some(NormalizedStatus::WaitingCustomer));
        assert_eq!(g.normalize_status("canceled"), Some(NormalizedStatus::Cancelled));
        assert_eq!(g.normalize_status("expired"), Some(NormalizedStatus::Expired));
        assert_eq!(g.normalize_status("ACCEPTED"), None);
    }

    #[test]
    fn parses_signed_webhook() {
        let (body, headers) = signed(&json!({
            "event": "payment.complete",
            "data": { "reference": "TXN1", "status": "complete", "amount": 5000, "currency": "XAF" }
        }));

        let n = gateway().parse_webhook(&body, &headers).unwrap();

        assert_eq!(n.transaction_id, "TXN1");
        assert_eq!(n.raw_status.as_deref(), Some("complete"));
        assert_eq!(n.amount, Some(5000));
    }

    #[test]
    fn merchant_reference_wins_over_gateway_reference() {
        let (body, headers) = signed(&json!({
            "event": "payment.complete",
            "data": { "reference": "trx.abc", "merchant_reference": "TXN9" }
        }));

        let n = gateway().parse_webhook(&body, &headers).unwrap();

        assert_eq!(n.transaction_id, "TXN9");
        assert_eq!(n.raw_status.as_deref(), Some("complete"));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let (_, headers) = signed(&json!({ "event": "payment.complete", "data": { "reference": "TXN1" } }));
        let tampered = br#"{"event":"payment.complete","data":{"reference":"TXN2"}}"#;

        assert!(matches!(
            gateway().parse_webhook(tampered, &headers),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn initiation_requires_payer_email() {
        use crate::domain::foundation::Timestamp;
        use crate::domain::payment::{NewPayment, PaymentPurpose};

        let payment = Payment::create(
            NewPayment {
                purpose: PaymentPurpose::Boost { days: 7 },
                amount: 1000,
                currency: "XAF".to_string(),
                gateway: GatewayKind::NotchPay,
                user_id: None,
                provider_id: None,
                description: None,
            },
            Timestamp::now(),
        )
        .unwrap();

        assert!(gateway().build_initiate_request(&payment, &Payer::default()).is_err());

        let payer = Payer {
            email: Some("pay@example.cm".to_string()),
            ..Payer::default()
        };
        let body = gateway().build_initiate_request(&payment, &payer).unwrap();
        assert_eq!(body["reference"], payment.transaction_id.as_str());
    }
}
