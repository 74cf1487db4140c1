//! Subscription status state machine.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored status of a subscription row.
///
/// The stored value may lag reality until the next expiry sweep; access
/// decisions use [`super::Subscription::is_active`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses that grant access while the end date is in the future.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Trial | SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Trial, Active)
                | (Trial, Expired)
                | (Trial, Cancelled)
                | (Active, Active)
                | (Active, Expired)
                | (Active, Cancelled)
                | (Expired, Active)
                | (Cancelled, Active)
                | (Cancelled, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trial => vec![Active, Expired, Cancelled],
            Active => vec![Active, Expired, Cancelled],
            Expired => vec![Active],
            Cancelled => vec![Active, Expired],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_can_be_renewed_into_active() {
        for status in [
            SubscriptionStatus::Trial,
            SubscriptionStatus::Active,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Cancelled,
        ] {
            assert!(status.can_transition_to(&SubscriptionStatus::Active));
        }
    }

    #[test]
    fn nothing_goes_back_to_trial() {
        assert!(!SubscriptionStatus::Expired.can_transition_to(&SubscriptionStatus::Trial));
        assert!(!SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Trial));
    }

    #[test]
    fn only_trial_and_active_grant_access() {
        assert!(SubscriptionStatus::Trial.grants_access());
        assert!(SubscriptionStatus::Active.grants_access());
        assert!(!SubscriptionStatus::Expired.grants_access());
        assert!(!SubscriptionStatus::Cancelled.grants_access());
    }
}
