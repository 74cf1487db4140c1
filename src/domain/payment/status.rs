//! Payment status state machine.
//!
//! ACCEPTED and REFUSED are terminal: once a payment reaches either,
//! later gateway deliveries for the same transaction are no-ops.
//! CANCELLED and EXPIRED close the payment for the client but still
//! accept a late ACCEPTED, since the gateway may settle after the fact.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created locally, gateway has not reported anything yet.
    Pending,
    /// Gateway is waiting on the customer (OTP, USSD confirmation, ...).
    WaitingCustomer,
    /// Money collected. Terminal.
    Accepted,
    /// Gateway declined the payment. Terminal.
    Refused,
    /// Customer or gateway abandoned the checkout.
    Cancelled,
    /// Checkout window elapsed without settlement.
    Expired,
}

impl PaymentStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [PaymentStatus; 6] = [
        PaymentStatus::Pending,
        PaymentStatus::WaitingCustomer,
        PaymentStatus::Accepted,
        PaymentStatus::Refused,
        PaymentStatus::Cancelled,
        PaymentStatus::Expired,
    ];

    /// Statuses from which a gateway result may still move the payment.
    pub const OPEN: [PaymentStatus; 2] = [PaymentStatus::Pending, PaymentStatus::WaitingCustomer];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::WaitingCustomer => "WAITING_CUSTOMER",
            PaymentStatus::Accepted => "ACCEPTED",
            PaymentStatus::Refused => "REFUSED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Expired => "EXPIRED",
        }
    }

    /// True while the payment is still awaiting a gateway decision.
    pub fn is_open(&self) -> bool {
        Self::OPEN.contains(self)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown payment status '{}'", s))
            })
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, WaitingCustomer)
                | (Pending, Accepted)
                | (Pending, Refused)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (WaitingCustomer, Accepted)
                | (WaitingCustomer, Refused)
                | (WaitingCustomer, Cancelled)
                | (WaitingCustomer, Expired)
                // Late settlement
                | (Cancelled, Accepted)
                | (Expired, Accepted)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![WaitingCustomer, Accepted, Refused, Cancelled, Expired],
            WaitingCustomer => vec![Accepted, Refused, Cancelled, Expired],
            Cancelled | Expired => vec![Accepted],
            Accepted | Refused => vec![],
        }
    }
}
