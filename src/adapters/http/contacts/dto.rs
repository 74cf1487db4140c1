//! HTTP DTOs for contact endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::contact::{Contact, ContactStatus, UnlockType};
use crate::domain::foundation::{ContactId, ProviderId, Timestamp};
use crate::domain::payment::GatewayKind;

use super::super::payments::PayerDetails;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// `POST /contacts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub provider_id: ProviderId,
    pub message: String,
    pub sender_name: String,
    pub sender_email: String,
    #[serde(default)]
    pub sender_phone: Option<String>,
}

/// `GET /contacts?providerId=` (admins may read any inbox)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
}

/// `POST /contacts/:id/unlock`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    #[serde(default)]
    pub gateway: Option<GatewayKind>,
    #[serde(flatten)]
    pub payer: PayerDetails,
}

/// `POST /contacts/:id/unlock/confirm`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUnlockRequest {
    pub transaction_id: String,
}

/// `POST /contacts/:id/grant`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantUnlockRequest {
    pub unlock_type: UnlockType,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement for the sender. Never echoes the stored PII.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCreatedResponse {
    pub id: ContactId,
    pub provider_id: ProviderId,
    pub status: ContactStatus,
    pub created_at: Timestamp,
}

impl From<&Contact> for ContactCreatedResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            provider_id: contact.provider_id,
            status: contact.status,
            created_at: contact.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unlock_request_accepts_empty_object() {
        let request: UnlockRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.gateway.is_none());
        assert!(request.payer.customer_email.is_none());
    }

    #[test]
    fn grant_request_reads_expiry() {
        let request: GrantUnlockRequest = serde_json::from_value(json!({
            "unlockType": "promo",
            "expiresAt": "2030-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(request.unlock_type, UnlockType::Promo);
        assert!(request.expires_at.is_some());
    }
}
