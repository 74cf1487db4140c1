//! HTTP DTOs for payment endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::application::InitiatedPayment;
use crate::domain::contact::Viewer;
use crate::domain::foundation::{ContactId, PaymentId, ProviderId, Timestamp};
use crate::domain::payment::{GatewayKind, Payment, PaymentStatus, PaymentType};
use crate::domain::subscription::SubscriptionPlan;
use crate::ports::Payer;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Customer details forwarded to the gateway checkout page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerDetails {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

impl PayerDetails {
    pub fn into_payer(self, viewer: &Viewer) -> Payer {
        Payer {
            user_id: viewer.user_id,
            name: self.customer_name,
            email: self.customer_email,
            phone: self.customer_phone,
        }
    }
}

/// `POST /payments/initialize`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub amount: i64,
    /// Kept as a string so an unknown value maps to `INVALID_PAYMENT_TYPE`
    /// instead of a serde rejection.
    #[serde(rename = "type")]
    pub payment_type: String,
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gateway: Option<GatewayKind>,
    /// Featured/boost duration.
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub plan: Option<SubscriptionPlan>,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    #[serde(flatten)]
    pub payer: PayerDetails,
}

impl InitializePaymentRequest {
    /// Purpose metadata in the shape stored on the payment row.
    pub fn metadata(&self) -> Value {
        let mut map = Map::new();
        if let Some(days) = self.days {
            map.insert("days".to_string(), json!(days));
        }
        if let Some(plan) = self.plan {
            map.insert("plan".to_string(), json!(plan.as_str()));
        }
        if let Some(contact_id) = self.contact_id {
            map.insert("contactId".to_string(), json!(contact_id.to_string()));
        }
        Value::Object(map)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Returned by every endpoint that opens a checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPaymentResponse {
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub payment_url: String,
    pub amount: i64,
    pub currency: String,
}

impl From<InitiatedPayment> for InitiatedPaymentResponse {
    fn from(initiated: InitiatedPayment) -> Self {
        Self {
            payment_id: initiated.payment.id,
            transaction_id: initiated.payment.transaction_id,
            payment_url: initiated.payment_url,
            amount: initiated.payment.amount,
            currency: initiated.payment.currency,
        }
    }
}

/// `GET /payments/:transactionId/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub paid_at: Option<Timestamp>,
}

impl From<Payment> for PaymentStatusResponse {
    fn from(payment: Payment) -> Self {
        Self {
            transaction_id: payment.transaction_id,
            status: payment.status,
            amount: payment.amount,
            currency: payment.currency,
            payment_type: payment.payment_type,
            payment_method: payment.payment_method,
            paid_at: payment.paid_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_reads_type_and_payer_fields() {
        let request: InitializePaymentRequest = serde_json::from_value(json!({
            "amount": 5000,
            "type": "boost",
            "days": 14,
            "customerEmail": "payer@example.com"
        }))
        .unwrap();

        assert_eq!(request.payment_type, "boost");
        assert_eq!(request.payer.customer_email.as_deref(), Some("payer@example.com"));
        assert_eq!(request.metadata(), json!({ "days": 14 }));
    }

    #[test]
    fn metadata_is_empty_without_purpose_fields() {
        let request: InitializePaymentRequest =
            serde_json::from_value(json!({ "amount": 1000, "type": "contact_premium" })).unwrap();

        assert_eq!(request.metadata(), json!({}));
    }
}
