//! Payment aggregate entity.
//!
//! A payment is created PENDING when a feature flow starts and is then only
//! moved by recognized gateway results. It is a financial record and is
//! never deleted.

use crate::domain::foundation::{
    DomainError, PaymentId, ProviderId, StateMachine, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{
    validate_amount, GatewayKind, GatewayResult, NormalizedStatus, PaymentPurpose, PaymentStatus,
    PaymentType,
};

/// Prefix of generated transaction ids.
pub const TRANSACTION_PREFIX: &str = "TXN";

/// Builds `<prefix><epoch-ms><random-suffix>`.
///
/// The suffix is 8 uppercase hex characters taken from a v4 UUID, so two ids
/// generated in the same millisecond still differ.
pub fn generate_transaction_id(prefix: &str, now: Timestamp) -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}{}{}", prefix, now.as_unix_millis(), &random[..8])
}

/// Input for creating a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub purpose: PaymentPurpose,
    pub amount: i64,
    pub currency: String,
    pub gateway: GatewayKind,
    pub user_id: Option<UserId>,
    pub provider_id: Option<ProviderId>,
    pub description: Option<String>,
}

/// One attempted monetary transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub transaction_id: String,
    pub user_id: Option<UserId>,
    pub provider_id: Option<ProviderId>,
    pub payment_type: PaymentType,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway: GatewayKind,
    pub payment_token: Option<String>,
    pub payment_url: Option<String>,
    pub operator_id: Option<String>,
    pub payment_method: Option<String>,
    pub error_message: Option<String>,
    pub paid_at: Option<Timestamp>,
    pub fund_availability_date: Option<Timestamp>,
    pub description: String,
    pub metadata: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Why a gateway result left a payment untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadyTerminal(PaymentStatus),
    Unchanged,
    TransitionNotAllowed {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    AmountMismatch {
        expected: i64,
        reported: i64,
    },
}

/// Result of evaluating a gateway result against a payment.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The payment moved; `previous` is the status it moved from.
    Applied {
        payment: Payment,
        previous: PaymentStatus,
    },
    Ignored(IgnoreReason),
}

impl Payment {
    /// Creates a PENDING payment after validating the amount.
    pub fn create(new: NewPayment, now: Timestamp) -> Result<Self, DomainError> {
        validate_amount(new.amount)?;
        if new.currency.trim().is_empty() {
            return Err(DomainError::validation("currency", "Currency is required"));
        }

        let payment_type = new.purpose.payment_type();
        let description = new
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| payment_type.label().to_string());

        Ok(Self {
            id: PaymentId::new(),
            transaction_id: generate_transaction_id(TRANSACTION_PREFIX, now),
            user_id: new.user_id,
            provider_id: new.provider_id,
            payment_type,
            amount: new.amount,
            currency: new.currency,
            status: PaymentStatus::Pending,
            gateway: new.gateway,
            payment_token: None,
            payment_url: None,
            operator_id: None,
            payment_method: None,
            error_message: None,
            paid_at: None,
            fund_availability_date: None,
            description,
            metadata: new.purpose.to_metadata(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Typed purpose recovered from type and metadata.
    pub fn purpose(&self) -> Result<PaymentPurpose, DomainError> {
        PaymentPurpose::from_parts(self.payment_type, &self.metadata)
    }

    /// Records the checkout handles returned by the gateway.
    pub fn attach_checkout(&mut self, token: Option<String>, url: Option<String>, now: Timestamp) {
        self.payment_token = token;
        self.payment_url = url;
        self.updated_at = now;
    }

    /// Evaluates a recognized gateway result without mutating `self`.
    ///
    /// Terminal payments, same-status reports, transitions the state machine
    /// forbids and ACCEPTED reports with a different amount are all ignored.
    pub fn apply(&self, result: &GatewayResult, now: Timestamp) -> ApplyOutcome {
        if self.status.is_terminal() {
            return ApplyOutcome::Ignored(IgnoreReason::AlreadyTerminal(self.status));
        }

        let target = PaymentStatus::from(result.status);
        if target == self.status {
            return ApplyOutcome::Ignored(IgnoreReason::Unchanged);
        }
        if !self.status.can_transition_to(&target) {
            return ApplyOutcome::Ignored(IgnoreReason::TransitionNotAllowed {
                from: self.status,
                to: target,
            });
        }

        let mut next = self.clone();
        next.status = target;
        next.updated_at = now;

        match result.status {
            NormalizedStatus::Accepted => {
                if let Some(reported) = result.amount {
                    if reported != self.amount {
                        return ApplyOutcome::Ignored(IgnoreReason::AmountMismatch {
                            expected: self.amount,
                            reported,
                        });
                    }
                }
                next.paid_at = Some(result.paid_at.unwrap_or(now));
                next.payment_method = result.payment_method.clone().or(next.payment_method);
                next.operator_id = result.operator_id.clone().or(next.operator_id);
                next.fund_availability_date = result.fund_availability_date;
                next.error_message = None;
            }
            NormalizedStatus::Refused => {
                next.error_message = Some(
                    result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "Payment refused by gateway".to_string()),
                );
                next.payment_method = result.payment_method.clone().or(next.payment_method);
            }
            NormalizedStatus::Cancelled | NormalizedStatus::Expired => {
                next.error_message = result.error_message.clone().or(next.error_message);
            }
            NormalizedStatus::WaitingCustomer => {
                next.payment_method = result.payment_method.clone().or(next.payment_method);
            }
        }

        ApplyOutcome::Applied {
            payment: next,
            previous: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::SubscriptionPlan;

    fn new_payment(amount: i64) -> NewPayment {
        NewPayment {
            purpose: PaymentPurpose::Subscription {
                plan: SubscriptionPlan::Monthly,
            },
            amount,
            currency: "XAF".to_string(),
            gateway: GatewayKind::CinetPay,
            user_id: Some(UserId::new()),
            provider_id: Some(ProviderId::new()),
            description: None,
        }
    }

    fn pending() -> Payment {
        Payment::create(new_payment(5000), Timestamp::now()).unwrap()
    }

    fn applied(outcome: ApplyOutcome) -> Payment {
        match outcome {
            ApplyOutcome::Applied { payment, .. } => payment,
            ApplyOutcome::Ignored(reason) => panic!("expected transition, got {:?}", reason),
        }
    }

    #[test]
    fn create_starts_pending_with_generated_transaction_id() {
        let payment = pending();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.transaction_id.starts_with(TRANSACTION_PREFIX));
        assert_eq!(payment.description, "Provider subscription");
        assert_eq!(payment.metadata["plan"], "monthly");
    }

    #[test]
    fn create_rejects_invalid_amount() {
        assert!(Payment::create(new_payment(99), Timestamp::now()).is_err());
        assert!(Payment::create(new_payment(5001), Timestamp::now()).is_err());
    }

    #[test]
    fn transaction_ids_are_unique_within_a_millisecond() {
        let now = Timestamp::now();
        let a = generate_transaction_id("TXN", now);
        let b = generate_transaction_id("TXN", now);

        assert_ne!(a, b);
        assert!(a.starts_with(&format!("TXN{}", now.as_unix_millis())));
        assert_eq!(a.len(), 3 + now.as_unix_millis().to_string().len() + 8);
    }

    #[test]
    fn accepted_sets_payment_details() {
        let now = Timestamp::now();
        let mut result = GatewayResult::accepted(5000);
        result.payment_method = Some("OM".to_string());
        result.operator_id = Some("OP-1".to_string());

        let payment = applied(pending().apply(&result, now));

        assert_eq!(payment.status, PaymentStatus::Accepted);
        assert_eq!(payment.paid_at, Some(now));
        assert_eq!(payment.payment_method.as_deref(), Some("OM"));
        assert_eq!(payment.operator_id.as_deref(), Some("OP-1"));
    }

    #[test]
    fn refused_records_error_message() {
        let payment = applied(pending().apply(&GatewayResult::refused("Insufficient funds"), Timestamp::now()));

        assert_eq!(payment.status, PaymentStatus::Refused);
        assert_eq!(payment.error_message.as_deref(), Some("Insufficient funds"));
    }

    #[test]
    fn terminal_payment_ignores_further_results() {
        let accepted = applied(pending().apply(&GatewayResult::accepted(5000), Timestamp::now()));

        assert_eq!(
            accepted.apply(&GatewayResult::refused("late"), Timestamp::now()),
            ApplyOutcome::Ignored(IgnoreReason::AlreadyTerminal(PaymentStatus::Accepted))
        );
        assert_eq!(
            accepted.apply(&GatewayResult::accepted(5000), Timestamp::now()),
            ApplyOutcome::Ignored(IgnoreReason::AlreadyTerminal(PaymentStatus::Accepted))
        );
    }

    #[test]
    fn amount_mismatch_is_not_applied() {
        let outcome = pending().apply(&GatewayResult::accepted(100), Timestamp::now());

        assert_eq!(
            outcome,
            ApplyOutcome::Ignored(IgnoreReason::AmountMismatch {
                expected: 5000,
                reported: 100
            })
        );
    }

    #[test]
    fn repeated_waiting_customer_is_unchanged() {
        let waiting = applied(pending().apply(
            &GatewayResult::with_status(NormalizedStatus::WaitingCustomer),
            Timestamp::now(),
        ));

        assert_eq!(
            waiting.apply(
                &GatewayResult::with_status(NormalizedStatus::WaitingCustomer),
                Timestamp::now()
            ),
            ApplyOutcome::Ignored(IgnoreReason::Unchanged)
        );
    }

    #[test]
    fn expired_payment_still_takes_late_acceptance_but_not_refusal() {
        let expired = applied(pending().apply(
            &GatewayResult::with_status(NormalizedStatus::Expired),
            Timestamp::now(),
        ));

        assert!(matches!(
            expired.apply(&GatewayResult::refused("x"), Timestamp::now()),
            ApplyOutcome::Ignored(IgnoreReason::TransitionNotAllowed { .. })
        ));
        let late = applied(expired.apply(&GatewayResult::accepted(5000), Timestamp::now()));
        assert_eq!(late.status, PaymentStatus::Accepted);
    }

    #[test]
    fn purpose_reads_back_from_metadata() {
        assert_eq!(
            pending().purpose().unwrap(),
            PaymentPurpose::Subscription {
                plan: SubscriptionPlan::Monthly
            }
        );
    }
}
