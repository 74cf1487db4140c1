use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::lock;
use crate::domain::foundation::{DomainError, PaymentId, Timestamp};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::ports::PaymentRepository;

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: Mutex<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored payment.
    pub fn all(&self) -> Vec<Payment> {
        self.payments
            .lock()
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = lock(&self.payments)?;
        if payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(DomainError::database(format!(
                "duplicate transaction id {}",
                payment.transaction_id
            )));
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(lock(&self.payments)?.get(id).cloned())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(lock(&self.payments)?
            .values()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn save_checkout(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = lock(&self.payments)?;
        let stored = payments
            .get_mut(&payment.id)
            .ok_or_else(|| DomainError::database("payment row missing"))?;
        stored.payment_token = payment.payment_token.clone();
        stored.payment_url = payment.payment_url.clone();
        stored.updated_at = payment.updated_at;
        Ok(())
    }

    async fn update_if_status(
        &self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, DomainError> {
        let mut payments = lock(&self.payments)?;
        match payments.get_mut(&payment.id) {
            Some(stored) if stored.status == expected => {
                *stored = payment.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_stale(
        &self,
        created_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut payments = lock(&self.payments)?;
        let mut count = 0;
        for payment in payments.values_mut() {
            if payment.status.is_open() && payment.created_at.is_before(&created_before) {
                payment.status = PaymentStatus::Expired;
                payment.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}
