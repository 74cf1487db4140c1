//! Events emitted when a payment reaches a terminal state.

use crate::domain::foundation::{PaymentId, ProviderId, UserId};

use super::{Payment, PaymentPurpose};

/// Emitted exactly once, on the transition into ACCEPTED.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAccepted {
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub purpose: PaymentPurpose,
    pub provider_id: Option<ProviderId>,
    pub user_id: Option<UserId>,
    pub amount: i64,
    pub currency: String,
}

impl PaymentAccepted {
    pub fn new(payment: &Payment, purpose: PaymentPurpose) -> Self {
        Self {
            payment_id: payment.id,
            transaction_id: payment.transaction_id.clone(),
            purpose,
            provider_id: payment.provider_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency.clone(),
        }
    }
}

/// Emitted on the transition into REFUSED.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRefused {
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub provider_id: Option<ProviderId>,
    pub user_id: Option<UserId>,
    pub reason: String,
}

impl PaymentRefused {
    pub fn new(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            transaction_id: payment.transaction_id.clone(),
            provider_id: payment.provider_id,
            user_id: payment.user_id,
            reason: payment
                .error_message
                .clone()
                .unwrap_or_else(|| "Payment refused".to_string()),
        }
    }
}

/// Terminal-transition event handed to fulfillment.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Accepted(PaymentAccepted),
    Refused(PaymentRefused),
}
