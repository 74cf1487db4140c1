//! Durable per-(user, provider) unlock entitlement.

use crate::domain::foundation::{
    PaymentId, ProviderId, Timestamp, UnlockedContactId, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an entitlement was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockType {
    Paid,
    Subscription,
    Free,
    Promo,
}

impl UnlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockType::Paid => "paid",
            UnlockType::Subscription => "subscription",
            UnlockType::Free => "free",
            UnlockType::Promo => "promo",
        }
    }

    /// Types an admin may hand out without payment.
    pub fn is_grantable(&self) -> bool {
        matches!(self, UnlockType::Free | UnlockType::Promo)
    }
}

impl fmt::Display for UnlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnlockType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(UnlockType::Paid),
            "subscription" => Ok(UnlockType::Subscription),
            "free" => Ok(UnlockType::Free),
            "promo" => Ok(UnlockType::Promo),
            other => Err(ValidationError::invalid_format(
                "unlockType",
                format!("unknown unlock type '{}'", other),
            )),
        }
    }
}

/// Provider `provider_id` may see the real details of messages sent by
/// `user_id`. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedContact {
    pub id: UnlockedContactId,
    pub user_id: UserId,
    pub provider_id: ProviderId,
    pub unlock_type: UnlockType,
    pub payment_id: Option<PaymentId>,
    /// `None` means lifetime.
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UnlockedContact {
    pub fn new(
        user_id: UserId,
        provider_id: ProviderId,
        unlock_type: UnlockType,
        payment_id: Option<PaymentId>,
        expires_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: UnlockedContactId::new(),
            user_id,
            provider_id,
            unlock_type,
            payment_id,
            expires_at,
            created_at: now,
        }
    }

    pub fn is_valid(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |expires| expires.is_after(&now))
    }
}
