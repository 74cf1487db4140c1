//! SubscriptionManager - provider billing periods.
//!
//! Activity is always re-derived from status and end date; nothing caches
//! an `is_active` flag. Renewals use an optimistic write keyed on the row's
//! `updated_at` and retry when a concurrent writer got in first.

use std::sync::Arc;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, ProviderId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::payment::{GatewayKind, PaymentPurpose};
use crate::domain::subscription::{
    PublicSubscriptionStatus, Subscription, SubscriptionPlan, SubscriptionSummary,
    REMINDER_WINDOW_DAYS,
};
use crate::ports::{Payer, SubscriptionRepository};

use super::{InitiatePaymentCommand, InitiatedPayment, PaymentCheckout};

const MAX_RENEW_ATTEMPTS: usize = 3;

/// Command to pay for a plan.
#[derive(Debug, Clone)]
pub struct SubscribeCommand {
    pub provider_id: ProviderId,
    pub user_id: UserId,
    pub plan: SubscriptionPlan,
    pub gateway: Option<GatewayKind>,
    pub payer: Payer,
}

pub struct SubscriptionManager {
    repository: Arc<dyn SubscriptionRepository>,
    checkout: Arc<PaymentCheckout>,
}

impl SubscriptionManager {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, checkout: Arc<PaymentCheckout>) -> Self {
        Self {
            repository,
            checkout,
        }
    }

    /// Starts the 30-day trial. Called once, when the provider profile is
    /// created.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the provider already has a row
    pub async fn create_trial(&self, provider_id: ProviderId) -> Result<Subscription, DomainError> {
        let subscription = Subscription::create_trial(provider_id, Timestamp::now());
        self.repository.insert(&subscription).await?;

        tracing::info!(provider_id = %provider_id, end_date = %subscription.end_date, "Trial started");
        Ok(subscription)
    }

    /// Adds one period of `plan` to the provider's subscription.
    ///
    /// Unexpired time is kept; after a lapse the period starts now.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the provider has no row
    /// - `InvalidPlan` for the trial plan
    pub async fn renew(
        &self,
        provider_id: ProviderId,
        plan: SubscriptionPlan,
        payment_id: Option<PaymentId>,
    ) -> Result<Subscription, DomainError> {
        for attempt in 1..=MAX_RENEW_ATTEMPTS {
            let mut subscription = self.require(&provider_id).await?;
            let last_seen = subscription.updated_at;
            subscription.renew(plan, payment_id, Timestamp::now())?;

            if self.repository.update(&subscription, last_seen).await? {
                tracing::info!(
                    provider_id = %provider_id,
                    plan = %plan,
                    end_date = %subscription.end_date,
                    "Subscription renewed"
                );
                return Ok(subscription);
            }
            tracing::debug!(provider_id = %provider_id, attempt, "Subscription changed concurrently");
        }

        Err(DomainError::new(
            ErrorCode::InvalidStateTransition,
            "Subscription is being modified concurrently, try again",
        ))
    }

    pub async fn is_active(&self, provider_id: &ProviderId) -> Result<bool, DomainError> {
        Ok(self
            .repository
            .find_by_provider(provider_id)
            .await?
            .map_or(false, |s| s.is_active(Timestamp::now())))
    }

    /// Owner-facing summary.
    pub async fn get_status(&self, provider_id: &ProviderId) -> Result<SubscriptionSummary, DomainError> {
        let subscription = self.require(provider_id).await?;
        Ok(subscription.summary(Timestamp::now()))
    }

    /// Public privileges only. A provider without a row is inactive.
    pub async fn public_status(
        &self,
        provider_id: &ProviderId,
    ) -> Result<PublicSubscriptionStatus, DomainError> {
        Ok(PublicSubscriptionStatus::from_active(
            self.is_active(provider_id).await?,
        ))
    }

    /// Bulk-expires lapsed trial/active rows. Safe to run repeatedly.
    pub async fn expire_old_subscriptions(&self) -> Result<u64, DomainError> {
        let count = self.repository.expire_lapsed(Timestamp::now()).await?;
        if count > 0 {
            tracing::info!(count, "Expired lapsed subscriptions");
        }
        Ok(count)
    }

    /// Subscriptions ending within the reminder window that have not been
    /// reminded for the current period.
    pub async fn get_expiring_soon(&self) -> Result<Vec<Subscription>, DomainError> {
        let now = Timestamp::now();
        self.repository
            .find_expiring(now, now.add_days(REMINDER_WINDOW_DAYS))
            .await
    }

    pub async fn mark_reminder_sent(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        if self.repository.mark_reminder_sent(id, Timestamp::now()).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ))
        }
    }

    /// Opens a payment for `plan` at the plan's price. The subscription is
    /// renewed once the gateway accepts the payment.
    pub async fn subscribe(&self, cmd: SubscribeCommand) -> Result<InitiatedPayment, DomainError> {
        if !cmd.plan.is_paid() {
            return Err(DomainError::new(
                ErrorCode::InvalidPlan,
                "Only paid plans can be subscribed to",
            ));
        }
        self.require(&cmd.provider_id).await?;

        self.checkout
            .initiate(InitiatePaymentCommand {
                purpose: PaymentPurpose::Subscription { plan: cmd.plan },
                amount: cmd.plan.price(),
                gateway: cmd.gateway,
                user_id: Some(cmd.user_id),
                provider_id: Some(cmd.provider_id),
                description: Some(format!("{} subscription", cmd.plan.display_name())),
                payer: cmd.payer,
            })
            .await
    }

    async fn require(&self, provider_id: &ProviderId) -> Result<Subscription, DomainError> {
        self.repository
            .find_by_provider(provider_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(ErrorCode::SubscriptionNotFound, "Subscription not found")
                    .with_detail("providerId", provider_id.to_string())
            })
    }
}
