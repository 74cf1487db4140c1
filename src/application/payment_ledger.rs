//! PaymentLedger - sole writer of payment rows.
//!
//! Gateway results are evaluated by the aggregate and written with a
//! conditional update keyed on the status the evaluation started from. A
//! writer that loses the race re-reads the row and evaluates again, which
//! for a duplicate delivery ends in a terminal-state no-op.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, Timestamp};
use crate::domain::payment::{
    ApplyOutcome, GatewayResult, IgnoreReason, NewPayment, Payment, PaymentAccepted,
    PaymentEvent, PaymentRefused, PaymentStatus,
};
use crate::ports::PaymentRepository;

/// Rounds of re-read and re-evaluate before giving up on a contended row.
const MAX_APPLY_ATTEMPTS: usize = 3;

/// Result of applying a gateway result.
#[derive(Debug, Clone)]
pub struct LedgerUpdate {
    /// The payment as stored after the call.
    pub payment: Payment,
    /// Set only when this call moved the payment into ACCEPTED or REFUSED.
    pub event: Option<PaymentEvent>,
}

impl LedgerUpdate {
    fn unchanged(payment: Payment) -> Self {
        Self {
            payment,
            event: None,
        }
    }
}

pub struct PaymentLedger {
    repository: Arc<dyn PaymentRepository>,
}

impl PaymentLedger {
    pub fn new(repository: Arc<dyn PaymentRepository>) -> Self {
        Self { repository }
    }

    /// Validates and stores a PENDING payment.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` below 100, above 1,500,000 or not a multiple of 5
    /// - `ValidationFailed` for an empty currency
    pub async fn create(&self, new: NewPayment) -> Result<Payment, DomainError> {
        let payment = Payment::create(new, Timestamp::now())?;
        self.repository.insert(&payment).await?;

        tracing::info!(
            transaction_id = %payment.transaction_id,
            payment_type = %payment.payment_type,
            amount = payment.amount,
            gateway = %payment.gateway,
            "Payment created"
        );
        Ok(payment)
    }

    pub async fn save_checkout(&self, payment: &Payment) -> Result<(), DomainError> {
        self.repository.save_checkout(payment).await
    }

    pub async fn find_by_id(&self, id: &PaymentId) -> Result<Payment, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| payment_not_found(&id.to_string()))
    }

    pub async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Payment, DomainError> {
        self.find_optional(transaction_id)
            .await?
            .ok_or_else(|| payment_not_found(transaction_id))
    }

    pub async fn find_optional(&self, transaction_id: &str) -> Result<Option<Payment>, DomainError> {
        self.repository.find_by_transaction_id(transaction_id).await
    }

    /// Applies a recognized gateway result.
    ///
    /// A payment that is already terminal, or a result that does not move
    /// it, is returned unchanged without an event.
    pub async fn apply_gateway_result(
        &self,
        payment: &Payment,
        result: &GatewayResult,
    ) -> Result<LedgerUpdate, DomainError> {
        let mut current = payment.clone();

        for _ in 0..MAX_APPLY_ATTEMPTS {
            let (next, previous) = match current.apply(result, Timestamp::now()) {
                ApplyOutcome::Applied { payment, previous } => (payment, previous),
                ApplyOutcome::Ignored(reason) => {
                    log_ignored(&current, reason);
                    return Ok(LedgerUpdate::unchanged(current));
                }
            };

            if self.repository.update_if_status(&next, previous).await? {
                tracing::info!(
                    transaction_id = %next.transaction_id,
                    from = %previous,
                    to = %next.status,
                    "Payment status changed"
                );
                let event = terminal_event(&next);
                return Ok(LedgerUpdate {
                    payment: next,
                    event,
                });
            }

            tracing::debug!(
                transaction_id = %current.transaction_id,
                "Payment changed concurrently, re-reading"
            );
            current = self.find_by_id(&current.id).await?;
        }

        tracing::warn!(
            transaction_id = %current.transaction_id,
            "Giving up on contended payment update"
        );
        Ok(LedgerUpdate::unchanged(current))
    }

    /// Expires PENDING and WAITING_CUSTOMER payments created before
    /// `created_before`.
    pub async fn expire_stale(&self, created_before: Timestamp) -> Result<u64, DomainError> {
        self.repository
            .expire_stale(created_before, Timestamp::now())
            .await
    }
}

fn payment_not_found(reference: &str) -> DomainError {
    DomainError::not_found(ErrorCode::PaymentNotFound, "Payment not found")
        .with_detail("reference", reference)
}

fn terminal_event(payment: &Payment) -> Option<PaymentEvent> {
    match payment.status {
        PaymentStatus::Accepted => match payment.purpose() {
            Ok(purpose) => Some(PaymentEvent::Accepted(PaymentAccepted::new(payment, purpose))),
            Err(e) => {
                tracing::error!(
                    transaction_id = %payment.transaction_id,
                    error = %e,
                    "Accepted payment has unreadable purpose"
                );
                None
            }
        },
        PaymentStatus::Refused => Some(PaymentEvent::Refused(PaymentRefused::new(payment))),
        _ => None,
    }
}

fn log_ignored(payment: &Payment, reason: IgnoreReason) {
    match reason {
        IgnoreReason::AmountMismatch { expected, reported } => tracing::error!(
            transaction_id = %payment.transaction_id,
            expected,
            reported,
            "Gateway reported a different amount, payment left unchanged"
        ),
        IgnoreReason::TransitionNotAllowed { from, to } => tracing::warn!(
            transaction_id = %payment.transaction_id,
            %from,
            %to,
            "Gateway result not applicable"
        ),
        IgnoreReason::AlreadyTerminal(status) => tracing::debug!(
            transaction_id = %payment.transaction_id,
            %status,
            "Payment already terminal"
        ),
        IgnoreReason::Unchanged => {}
    }
}
