//! CinetPay gateway adapter.
//!
//! Initiation and status checks go to `/v2/payment` and `/v2/payment/check`.
//! Notifications arrive as form-encoded (or JSON) `cpm_*` fields and are
//! authenticated by the `x-token` header: a hex HMAC-SHA256, keyed with the
//! merchant secret, over the concatenation of the fields in
//! [`TOKEN_FIELDS`] order.
//!
//! The token does not cover any status field, so a notification never
//! carries a status: the caller always reconciles through
//! [`PaymentGateway::check_status`].

use async_trait::async_trait;
use http::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::{non_empty, parse_amount, parse_datetime, signature_matches};
use crate::domain::payment::{GatewayKind, GatewayNotification, NormalizedStatus, Payment};
use crate::ports::{CheckoutSession, GatewayError, Payer, PaymentGateway};

/// Fields covered by the `x-token` HMAC, in signing order.
const TOKEN_FIELDS: [&str; 16] = [
    "cpm_site_id",
    "cpm_trans_id",
    "cpm_trans_date",
    "cpm_amount",
    "cpm_currency",
    "signature",
    "payment_method",
    "cel_phone_num",
    "cpm_phone_prefixe",
    "cpm_language",
    "cpm_version",
    "cpm_payment_config",
    "cpm_page_action",
    "cpm_custom",
    "cpm_designation",
    "cpm_error_message",
];

/// Response code of a created checkout.
const CODE_CREATED: &str = "201";

#[derive(Clone)]
pub struct CinetPayConfig {
    api_key: SecretString,
    site_id: String,
    secret_key: SecretString,
    base_url: String,
    notify_url: String,
    return_url: String,
    timeout: Duration,
}

impl CinetPayConfig {
    pub fn new(
        api_key: SecretString,
        site_id: impl Into<String>,
        secret_key: SecretString,
    ) -> Self {
        Self {
            api_key,
            site_id: site_id.into(),
            secret_key,
            base_url: "https://api-checkout.cinetpay.com".to_string(),
            notify_url: String::new(),
            return_url: String::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_urls(mut self, notify_url: impl Into<String>, return_url: impl Into<String>) -> Self {
        self.notify_url = notify_url.into();
        self.return_url = return_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct CinetPayGateway {
    config: CinetPayConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CinetPayResponse {
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl CinetPayGateway {
    pub fn new(config: CinetPayConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(e.to_string()))?;
        Ok(Self { config, http_client })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<CinetPayResponse, GatewayError> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        // CinetPay reports business errors with 4xx plus a JSON body.
        serde_json::from_str::<CinetPayResponse>(&text).map_err(|e| {
            tracing::warn!(http_status = %status, error = %e, "unreadable CinetPay response");
            GatewayError::parse(format!("CinetPay returned HTTP {}: {}", status, e))
        })
    }

    fn notification_from_data(transaction_id: &str, data: &Value) -> GatewayNotification {
        let text = |key: &str| non_empty(data.get(key).and_then(Value::as_str));
        let raw_status = text("status");
        let is_refused = raw_status.as_deref() == Some("REFUSED");

        GatewayNotification {
            transaction_id: transaction_id.to_string(),
            raw_status,
            amount: data.get("amount").and_then(parse_amount),
            currency: text("currency"),
            payment_method: text("payment_method"),
            operator_id: text("operator_id"),
            paid_at: text("payment_date").as_deref().and_then(parse_datetime),
            fund_availability_date: text("fund_availability_date")
                .as_deref()
                .and_then(parse_datetime),
            error_message: if is_refused { text("description") } else { None },
        }
    }

    fn parse_fields(body: &[u8]) -> Result<HashMap<String, String>, GatewayError> {
        if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
            return Ok(map
                .into_iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k, value)
                })
                .collect());
        }
        serde_urlencoded::from_bytes::<HashMap<String, String>>(body)
            .map_err(|e| GatewayError::parse(format!("invalid form body: {}", e)))
    }

    fn verify_token(&self, fields: &HashMap<String, String>, headers: &HeaderMap) -> Result<(), GatewayError> {
        let token = headers
            .get("x-token")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                tracing::warn!("CinetPay notification without x-token header");
                GatewayError::InvalidSignature
            })?;

        let signed: String = TOKEN_FIELDS
            .iter()
            .map(|key| fields.get(*key).map(String::as_str).unwrap_or(""))
            .collect();

        if !signature_matches(
            self.config.secret_key.expose_secret().as_bytes(),
            signed.as_bytes(),
            token,
        ) {
            tracing::warn!(
                transaction_id = fields.get("cpm_trans_id").map(String::as_str).unwrap_or(""),
                "CinetPay x-token mismatch"
            );
            return Err(GatewayError::InvalidSignature);
        }
        Ok(())
    }
}

/// Keeps what CinetPay accepts in a description: letters, digits, spaces.
fn sanitize_description(description: &str) -> String {
    description
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

#[async_trait]
impl PaymentGateway for CinetPayGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::CinetPay
    }

    fn normalize_status(&self, raw_status: &str) -> Option<NormalizedStatus> {
        match raw_status.trim().to_ascii_uppercase().as_str() {
            "ACCEPTED" => Some(NormalizedStatus::Accepted),
            "REFUSED" => Some(NormalizedStatus::Refused),
            "WAITING_CUSTOMER_PAYMENT"
            | "WAITING_CUSTOMER_TO_VALIDATE"
            | "WAITING_CUSTOMER_OTP_CODE" => Some(NormalizedStatus::WaitingCustomer),
            "CANCELED" | "CANCELLED" => Some(NormalizedStatus::Cancelled),
            "EXPIRED" => Some(NormalizedStatus::Expired),
            _ => None,
        }
    }

    fn build_initiate_request(&self, payment: &Payment, payer: &Payer) -> Result<Value, GatewayError> {
        let mut description = sanitize_description(&payment.description);
        if description.is_empty() {
            description = sanitize_description(payment.payment_type.label());
        }
        let customer_id = payer.user_id.map(|id| id.to_string()).unwrap_or_default();

        Ok(json!({
            "apikey": self.config.api_key.expose_secret(),
            "site_id": self.config.site_id,
            "transaction_id": payment.transaction_id,
            "amount": payment.amount,
            "currency": payment.currency,
            "description": description,
            "notify_url": self.config.notify_url,
            "return_url": self.config.return_url,
            "channels": "ALL",
            "lang": "fr",
            "metadata": payment.id.to_string(),
            "customer_id": customer_id,
            "customer_name": payer.name.clone().unwrap_or_default(),
            "customer_email": payer.email.clone().unwrap_or_default(),
            "customer_phone_number": payer.phone.clone().unwrap_or_default(),
        }))
    }

    async fn initiate(&self, payment: &Payment, payer: &Payer) -> Result<CheckoutSession, GatewayError> {
        let body = self.build_initiate_request(payment, payer)?;
        let response = self.post("/v2/payment", &body).await?;

        if response.code != CODE_CREATED {
            tracing::warn!(
                transaction_id = %payment.transaction_id,
                code = %response.code,
                message = %response.message,
                "CinetPay refused checkout"
            );
            return Err(GatewayError::rejected(
                response.code,
                response.description.unwrap_or(response.message),
            ));
        }

        let data = response
            .data
            .ok_or_else(|| GatewayError::parse("CinetPay checkout without data"))?;
        let payment_url = non_empty(data.get("payment_url").and_then(Value::as_str))
            .ok_or_else(|| GatewayError::parse("CinetPay checkout without payment_url"))?;

        Ok(CheckoutSession {
            payment_url,
            payment_token: non_empty(data.get("payment_token").and_then(Value::as_str)),
        })
    }

    async fn check_status(&self, payment: &Payment) -> Result<GatewayNotification, GatewayError> {
        let body = json!({
            "apikey": self.config.api_key.expose_secret(),
            "site_id": self.config.site_id,
            "transaction_id": payment.transaction_id,
        });
        let response = self.post("/v2/payment/check", &body).await?;

        match response.data {
            Some(data) => Ok(Self::notification_from_data(&payment.transaction_id, &data)),
            None => Err(GatewayError::rejected(response.code, response.message)),
        }
    }

    fn parse_webhook(&self, body: &[u8], headers: &HeaderMap) -> Result<GatewayNotification, GatewayError> {
        let fields = Self::parse_fields(body)?;
        self.verify_token(&fields, headers)?;

        let field = |key: &str| non_empty(fields.get(key).map(String::as_str));
        let transaction_id =
            field("cpm_trans_id").ok_or_else(|| GatewayError::parse("missing cpm_trans_id"))?;
        let error_message = field("cpm_error_message").filter(|m| m != "SUCCES");

        Ok(GatewayNotification {
            transaction_id,
            raw_status: None,
            amount: field("cpm_amount").and_then(|a| parse_amount(&Value::String(a))),
            currency: field("cpm_currency"),
            payment_method: field("payment_method"),
            operator_id: field("cpm_payid"),
            paid_at: field("cpm_trans_date").as_deref().and_then(parse_datetime),
            fund_availability_date: None,
            error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::hmac_hex;
    use http::HeaderValue;

    const SECRET: &str = "cinetpay-secret";

    fn gateway() -> CinetPayGateway {
        let config = CinetPayConfig::new(
            SecretString::new("api-key".to_string()),
            "105",
            SecretString::new(SECRET.to_string()),
        );
        CinetPayGateway::new(config).unwrap()
    }

    fn signed_form(pairs: &[(&str, &str)]) -> (Vec<u8>, HeaderMap) {
        let body = serde_urlencoded::to_string(pairs).unwrap();
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        let signed: String = TOKEN_FIELDS
            .iter()
            .map(|k| map.get(k).copied().unwrap_or(""))
            .collect();
        let token = hmac_hex(SECRET.as_bytes(), signed.as_bytes()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_str(&token).unwrap());
        (body.into_bytes(), headers)
    }

    #[test]
    fn maps_vendor_statuses() {
        let g = gateway();
        assert_eq!(g.normalize_status("ACCEPTED"), Some(NormalizedStatus::Accepted));
        assert_eq!(g.normalize_status("REFUSED"), Some(NormalizedStatus::Refused));
        assert_eq!(
            g.normalize_status("WAITING_CUSTOMER_OTP_CODE"),
            Some(NormalizedStatus::WaitingCustomer)
        );
        assert_eq!(g.normalize_status("CANCELED"), Some(NormalizedStatus::Cancelled));
        assert_eq!(g.normalize_status("EXPIRED"), Some(NormalizedStatus::Expired));
    }

    #[test]
    fn unknown_status_is_not_mapped() {
        assert_eq!(gateway().normalize_status("PENDING"), None);
        assert_eq!(gateway().normalize_status("complete"), None);
    }

    #[test]
    fn parses_signed_form_notification() {
        let (body, headers) = signed_form(&[
            ("cpm_site_id", "105"),
            ("cpm_trans_id", "TXN1705314600000ABCDEF12"),
            ("cpm_trans_date", "2024-01-15 10:30:00"),
            ("cpm_amount", "5000"),
            ("cpm_currency", "XAF"),
            ("payment_method", "OM"),
            ("cpm_error_message", "SUCCES"),
        ]);

        let notification = gateway().parse_webhook(&body, &headers).unwrap();

        assert_eq!(notification.transaction_id, "TXN1705314600000ABCDEF12");
        assert_eq!(notification.amount, Some(5000));
        assert_eq!(notification.payment_method.as_deref(), Some("OM"));
        assert!(notification.raw_status.is_none());
        assert!(notification.error_message.is_none());
    }

    #[test]
    fn appended_status_is_ignored() {
        let (mut body, headers) = signed_form(&[
            ("cpm_site_id", "105"),
            ("cpm_trans_id", "TXN1"),
            ("cpm_amount", "5000"),
            ("cpm_currency", "XAF"),
        ]);
        body.extend_from_slice(b"&cpm_trans_status=ACCEPTED&status=ACCEPTED");

        let notification = gateway().parse_webhook(&body, &headers).unwrap();

        assert_eq!(notification.transaction_id, "TXN1");
        assert!(notification.raw_status.is_none());
    }

    #[test]
    fn wrong_token_is_a_signature_error() {
        let (body, _) = signed_form(&[("cpm_trans_id", "TXN1")]);
        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_static("deadbeef"));

        assert!(matches!(
            gateway().parse_webhook(&body, &headers),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn missing_token_is_a_signature_error() {
        let (body, _) = signed_form(&[("cpm_trans_id", "TXN1")]);

        assert!(matches!(
            gateway().parse_webhook(&body, &HeaderMap::new()),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn signed_notification_without_transaction_is_a_parse_error() {
        let (body, headers) = signed_form(&[("cpm_amount", "5000")]);

        assert!(matches!(
            gateway().parse_webhook(&body, &headers),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn check_response_data_becomes_notification() {
        let data = json!({
            "amount": "5000",
            "currency": "XAF",
            "status": "ACCEPTED",
            "payment_method": "MOMO",
            "operator_id": "MP240115.1030.A12345",
            "payment_date": "2024-01-15 10:30:00",
        });

        let n = CinetPayGateway::notification_from_data("TXN1", &data);

        assert_eq!(n.raw_status.as_deref(), Some("ACCEPTED"));
        assert_eq!(n.amount, Some(5000));
        assert_eq!(n.operator_id.as_deref(), Some("MP240115.1030.A12345"));
        assert!(n.paid_at.is_some());
    }

    #[test]
    fn description_is_sanitized() {
        assert_eq!(sanitize_description("Boost #1 / 7 days & more"), "Boost 1  7 days  more");
    }
}
