//! Typed view of what an accepted payment must produce.
//!
//! Payments persist a `type` column plus free-form JSON metadata. The
//! fulfillment side never reads those directly; it matches on
//! [`PaymentPurpose`], which carries only the fields each effect needs.

use crate::domain::foundation::{ContactId, DomainError, ErrorCode};
use crate::domain::subscription::SubscriptionPlan;
use serde_json::{json, Value};

use super::PaymentType;

/// Default featured-listing duration.
pub const DEFAULT_FEATURED_DAYS: u32 = 30;

/// Default boost duration.
pub const DEFAULT_BOOST_DAYS: u32 = 7;

/// Longest duration a single featured/boost purchase may cover.
pub const MAX_PROMOTION_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentPurpose {
    /// Premium message to a provider. Produces a receipt only.
    ContactPremium { contact_id: Option<ContactId> },
    Featured { days: u32 },
    Boost { days: u32 },
    Subscription { plan: SubscriptionPlan },
    ContactUnlock { contact_id: ContactId },
}

impl PaymentPurpose {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentPurpose::ContactPremium { .. } => PaymentType::ContactPremium,
            PaymentPurpose::Featured { .. } => PaymentType::Featured,
            PaymentPurpose::Boost { .. } => PaymentType::Boost,
            PaymentPurpose::Subscription { .. } => PaymentType::Subscription,
            PaymentPurpose::ContactUnlock { .. } => PaymentType::ContactUnlock,
        }
    }

    /// Reads the purpose back from the stored type and metadata.
    pub fn from_parts(payment_type: PaymentType, metadata: &Value) -> Result<Self, DomainError> {
        match payment_type {
            PaymentType::ContactPremium => Ok(PaymentPurpose::ContactPremium {
                contact_id: optional_contact_id(metadata)?,
            }),
            PaymentType::Featured => Ok(PaymentPurpose::Featured {
                days: days(metadata, DEFAULT_FEATURED_DAYS)?,
            }),
            PaymentType::Boost => Ok(PaymentPurpose::Boost {
                days: days(metadata, DEFAULT_BOOST_DAYS)?,
            }),
            PaymentType::Subscription => {
                let raw = metadata
                    .get("plan")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        DomainError::new(ErrorCode::InvalidPlan, "Subscription payment has no plan")
                    })?;
                let plan: SubscriptionPlan = raw.parse()?;
                if !plan.is_paid() {
                    return Err(DomainError::new(
                        ErrorCode::InvalidPlan,
                        format!("Plan '{}' cannot be purchased", plan),
                    ));
                }
                Ok(PaymentPurpose::Subscription { plan })
            }
            PaymentType::ContactUnlock => optional_contact_id(metadata)?
                .map(|contact_id| PaymentPurpose::ContactUnlock { contact_id })
                .ok_or_else(|| {
                    DomainError::validation("metadata.contactId", "Contact unlock needs a contactId")
                }),
        }
    }

    /// Metadata persisted alongside the payment.
    pub fn to_metadata(&self) -> Value {
        match self {
            PaymentPurpose::ContactPremium { contact_id: Some(id) } => {
                json!({ "contactId": id.to_string() })
            }
            PaymentPurpose::ContactPremium { contact_id: None } => json!({}),
            PaymentPurpose::Featured { days } | PaymentPurpose::Boost { days } => {
                json!({ "days": days })
            }
            PaymentPurpose::Subscription { plan } => json!({ "plan": plan.as_str() }),
            PaymentPurpose::ContactUnlock { contact_id } => {
                json!({ "contactId": contact_id.to_string() })
            }
        }
    }
}

fn optional_contact_id(metadata: &Value) -> Result<Option<ContactId>, DomainError> {
    match metadata.get("contactId").and_then(Value::as_str) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<ContactId>()
            .map(Some)
            .map_err(|_| DomainError::validation("metadata.contactId", "contactId is not a UUID")),
    }
}

fn days(metadata: &Value, default: u32) -> Result<u32, DomainError> {
    let Some(raw) = metadata.get("days") else {
        return Ok(default);
    };
    raw.as_u64()
        .filter(|d| (1..=u64::from(MAX_PROMOTION_DAYS)).contains(d))
        .map(|d| d as u32)
        .ok_or_else(|| {
            DomainError::validation(
                "metadata.days",
                format!("days must be between 1 and {}", MAX_PROMOTION_DAYS),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn featured_defaults_to_thirty_days() {
        let purpose = PaymentPurpose::from_parts(PaymentType::Featured, &json!({})).unwrap();
        assert_eq!(purpose, PaymentPurpose::Featured { days: 30 });
    }

    #[test]
    fn boost_reads_days_from_metadata() {
        let purpose = PaymentPurpose::from_parts(PaymentType::Boost, &json!({ "days": 14 })).unwrap();
        assert_eq!(purpose, PaymentPurpose::Boost { days: 14 });
    }

    #[test]
    fn zero_days_is_rejected() {
        assert!(PaymentPurpose::from_parts(PaymentType::Boost, &json!({ "days": 0 })).is_err());
    }

    #[test]
    fn subscription_requires_a_paid_plan() {
        let err =
            PaymentPurpose::from_parts(PaymentType::Subscription, &json!({ "plan": "trial" }))
                .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPlan);

        let ok = PaymentPurpose::from_parts(PaymentType::Subscription, &json!({ "plan": "monthly" }))
            .unwrap();
        assert_eq!(ok, PaymentPurpose::Subscription { plan: SubscriptionPlan::Monthly });
    }

    #[test]
    fn contact_unlock_requires_contact_id() {
        assert!(PaymentPurpose::from_parts(PaymentType::ContactUnlock, &json!({})).is_err());
    }

    #[test]
    fn metadata_reads_back_to_the_same_purpose() {
        let contact_id = ContactId::new();
        let purpose = PaymentPurpose::ContactUnlock { contact_id };

        let back = PaymentPurpose::from_parts(purpose.payment_type(), &purpose.to_metadata()).unwrap();

        assert_eq!(back, purpose);
    }
}
