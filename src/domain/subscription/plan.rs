//! Subscription plans and their prices.

use crate::domain::foundation::{DomainError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of the free trial every new provider receives.
pub const TRIAL_DAYS: i64 = 30;

/// Billing plan of a provider subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    /// Free introductory period. Cannot be purchased or renewed into.
    Trial,
    Monthly,
    Quarterly,
    Yearly,
}

impl SubscriptionPlan {
    pub const PAID: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Monthly,
        SubscriptionPlan::Quarterly,
        SubscriptionPlan::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Trial => "trial",
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Quarterly => "quarterly",
            SubscriptionPlan::Yearly => "yearly",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionPlan::Trial)
    }

    /// Price in XAF.
    pub fn price(&self) -> i64 {
        match self {
            SubscriptionPlan::Trial => 0,
            SubscriptionPlan::Monthly => 5_000,
            SubscriptionPlan::Quarterly => 13_500,
            SubscriptionPlan::Yearly => 50_000,
        }
    }

    /// Validity window granted by one purchase.
    pub fn duration_days(&self) -> i64 {
        match self {
            SubscriptionPlan::Trial => TRIAL_DAYS,
            SubscriptionPlan::Monthly => 30,
            SubscriptionPlan::Quarterly => 90,
            SubscriptionPlan::Yearly => 365,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionPlan::Trial => "Trial",
            SubscriptionPlan::Monthly => "Monthly",
            SubscriptionPlan::Quarterly => "Quarterly",
            SubscriptionPlan::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionPlan {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(SubscriptionPlan::Trial),
            "monthly" => Ok(SubscriptionPlan::Monthly),
            "quarterly" => Ok(SubscriptionPlan::Quarterly),
            "yearly" => Ok(SubscriptionPlan::Yearly),
            _ => Err(DomainError::new(
                ErrorCode::InvalidPlan,
                format!("Unknown subscription plan '{}'", s),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_is_not_paid() {
        assert!(!SubscriptionPlan::Trial.is_paid());
        assert_eq!(SubscriptionPlan::Trial.price(), 0);
    }

    #[test]
    fn paid_plan_prices() {
        assert_eq!(SubscriptionPlan::Monthly.price(), 5_000);
        assert_eq!(SubscriptionPlan::Quarterly.price(), 13_500);
        assert_eq!(SubscriptionPlan::Yearly.price(), 50_000);
    }

    #[test]
    fn paid_plan_prices_are_valid_payment_amounts() {
        for plan in SubscriptionPlan::PAID {
            assert!(crate::domain::payment::validate_amount(plan.price()).is_ok());
        }
    }

    #[test]
    fn unknown_plan_has_invalid_plan_code() {
        let err = "weekly".parse::<SubscriptionPlan>().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPlan);
    }
}
