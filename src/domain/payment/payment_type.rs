//! Payment type and the amount rule shared by every payment flow.

use crate::domain::foundation::{DomainError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest amount any gateway accepts, in minor-less XAF.
pub const MIN_AMOUNT: i64 = 100;

/// Highest amount accepted for a single payment.
pub const MAX_AMOUNT: i64 = 1_500_000;

/// Amounts must be a multiple of this step.
pub const AMOUNT_STEP: i64 = 5;

/// What a payment buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    ContactPremium,
    Featured,
    Boost,
    Subscription,
    ContactUnlock,
}

impl PaymentType {
    pub const ALL: [PaymentType; 5] = [
        PaymentType::ContactPremium,
        PaymentType::Featured,
        PaymentType::Boost,
        PaymentType::Subscription,
        PaymentType::ContactUnlock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::ContactPremium => "contact_premium",
            PaymentType::Featured => "featured",
            PaymentType::Boost => "boost",
            PaymentType::Subscription => "subscription",
            PaymentType::ContactUnlock => "contact_unlock",
        }
    }

    /// Human-readable label used in gateway checkout descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentType::ContactPremium => "Premium contact",
            PaymentType::Featured => "Featured listing",
            PaymentType::Boost => "Listing boost",
            PaymentType::Subscription => "Provider subscription",
            PaymentType::ContactUnlock => "Contact unlock",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InvalidPaymentType,
                    format!("Unknown payment type '{}'", s),
                )
                .with_detail("field", "type")
            })
    }
}

/// Checks an amount against the gateway rules.
pub fn validate_amount(amount: i64) -> Result<(), DomainError> {
    if amount < MIN_AMOUNT {
        return Err(DomainError::new(
            ErrorCode::InvalidAmount,
            format!("Amount must be at least {}", MIN_AMOUNT),
        )
        .with_detail("field", "amount"));
    }
    if amount > MAX_AMOUNT {
        return Err(DomainError::new(
            ErrorCode::InvalidAmount,
            format!("Amount must not exceed {}", MAX_AMOUNT),
        )
        .with_detail("field", "amount"));
    }
    if amount % AMOUNT_STEP != 0 {
        return Err(DomainError::new(
            ErrorCode::InvalidAmount,
            format!("Amount must be a multiple of {}", AMOUNT_STEP),
        )
        .with_detail("field", "amount"));
    }
    Ok(())
}
