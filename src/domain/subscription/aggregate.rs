//! Subscription aggregate entity.
//!
//! One row per provider. A provider receives a trial row when its profile is
//! created; every accepted subscription payment renews that same row.

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, ProviderId, StateMachine, SubscriptionId, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::{SubscriptionPlan, SubscriptionStatus};

/// How far ahead renewal reminders look.
pub const REMINDER_WINDOW_DAYS: i64 = 7;

/// A provider's billing state.
///
/// # Invariants
///
/// - `provider_id` is unique
/// - `end_date` is in the future when renewed or created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub provider_id: ProviderId,
    pub status: SubscriptionStatus,
    pub plan: SubscriptionPlan,
    pub price: i64,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Last payment that (re)activated the subscription.
    pub payment_id: Option<PaymentId>,
    pub reminder_sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates the 30-day trial a new provider starts with.
    pub fn create_trial(provider_id: ProviderId, now: Timestamp) -> Self {
        Self {
            id: SubscriptionId::new(),
            provider_id,
            status: SubscriptionStatus::Trial,
            plan: SubscriptionPlan::Trial,
            price: 0,
            start_date: now,
            end_date: now.add_days(SubscriptionPlan::Trial.duration_days()),
            payment_id: None,
            reminder_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Source of truth for every gating decision.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.status.grants_access() && self.end_date.is_after(&now)
    }

    pub fn is_trial(&self) -> bool {
        self.status == SubscriptionStatus::Trial
    }

    /// Start of the window a renewal adds time to.
    ///
    /// Unexpired time is kept: the window starts at the later of `now` and
    /// the current end date. After a lapse it starts at `now`.
    pub fn renewal_anchor(&self, now: Timestamp) -> Timestamp {
        if self.status == SubscriptionStatus::Expired {
            now
        } else {
            now.latest(self.end_date)
        }
    }

    /// Renews onto a paid plan.
    ///
    /// # Errors
    ///
    /// `InvalidPlan` if `plan` is the trial plan.
    pub fn renew(
        &mut self,
        plan: SubscriptionPlan,
        payment_id: Option<PaymentId>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        if !plan.is_paid() {
            return Err(DomainError::new(
                ErrorCode::InvalidPlan,
                "The trial plan cannot be renewed",
            ));
        }

        let anchor = self.renewal_anchor(now);
        self.status = self.status.transition_to(SubscriptionStatus::Active).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot renew subscription in status {}", self.status),
            )
        })?;
        if anchor == now {
            self.start_date = now;
        }
        self.end_date = anchor.add_days(plan.duration_days());
        self.plan = plan;
        self.price = plan.price();
        self.payment_id = payment_id.or(self.payment_id);
        self.reminder_sent_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Moves a lapsed trial/active row to expired. Returns false if there was
    /// nothing to do.
    pub fn expire_if_lapsed(&mut self, now: Timestamp) -> bool {
        if !self.status.grants_access() || self.end_date.is_after(&now) {
            return false;
        }
        self.status = SubscriptionStatus::Expired;
        self.updated_at = now;
        true
    }

    /// Whole days left, rounded up. Zero once the end date has passed.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        let seconds = self.end_date.duration_since(&now).num_seconds();
        if seconds <= 0 {
            return 0;
        }
        (seconds + 86_399) / 86_400
    }

    /// True when a renewal reminder is due: ends within the window and no
    /// reminder has been sent for the current period.
    pub fn needs_reminder(&self, now: Timestamp) -> bool {
        self.reminder_sent_at.is_none()
            && self.status.grants_access()
            && self.end_date.is_after(&now)
            && !self.end_date.is_after(&now.add_days(REMINDER_WINDOW_DAYS))
    }

    pub fn mark_reminder_sent(&mut self, now: Timestamp) {
        self.reminder_sent_at = Some(now);
        self.updated_at = now;
    }

    pub fn summary(&self, now: Timestamp) -> SubscriptionSummary {
        SubscriptionSummary {
            status: self.status,
            is_active: self.is_active(now),
            plan: self.plan,
            end_date: self.end_date,
            days_remaining: self.days_remaining(now),
            is_trial: self.is_trial(),
        }
    }
}

/// Owner-facing view of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub plan: SubscriptionPlan,
    pub end_date: Timestamp,
    pub days_remaining: i64,
    pub is_trial: bool,
}

/// Public view of a provider's privileges. Leaks no plan or dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSubscriptionStatus {
    pub is_active: bool,
    pub can_contact: bool,
    pub show_images: bool,
}

impl PublicSubscriptionStatus {
    pub fn from_active(is_active: bool) -> Self {
        Self {
            is_active,
            can_contact: is_active,
            show_images: is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_until(days_from_now: i64, now: Timestamp) -> Subscription {
        let mut sub = Subscription::create_trial(ProviderId::new(), now.minus_days(60));
        sub.status = SubscriptionStatus::Active;
        sub.plan = SubscriptionPlan::Monthly;
        sub.end_date = now.add_days(days_from_now);
        sub
    }

    #[test]
    fn trial_lasts_thirty_days() {
        let now = Timestamp::now();
        let sub = Subscription::create_trial(ProviderId::new(), now);

        assert_eq!(sub.status, SubscriptionStatus::Trial);
        assert_eq!(sub.end_date, now.add_days(30));
        assert!(sub.is_active(now));
        assert_eq!(sub.days_remaining(now), 30);
    }

    #[test]
    fn renewing_early_keeps_unexpired_time() {
        let now = Timestamp::now();
        let mut sub = active_until(10, now);

        sub.renew(SubscriptionPlan::Monthly, Some(PaymentId::new()), now).unwrap();

        assert_eq!(sub.end_date, now.add_days(40));
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn renewing_after_lapse_anchors_at_now() {
        let now = Timestamp::now();
        let mut sub = active_until(-5, now);
        sub.status = SubscriptionStatus::Expired;

        sub.renew(SubscriptionPlan::Monthly, None, now).unwrap();

        assert_eq!(sub.end_date, now.add_days(30));
        assert_eq!(sub.start_date, now);
    }

    #[test]
    fn unswept_lapsed_row_anchors_at_now() {
        let now = Timestamp::now();
        let mut sub = active_until(-5, now);

        sub.renew(SubscriptionPlan::Quarterly, None, now).unwrap();

        assert_eq!(sub.end_date, now.add_days(90));
        assert_eq!(sub.price, 13_500);
    }

    #[test]
    fn renew_into_trial_is_invalid_plan() {
        let now = Timestamp::now();
        let mut sub = active_until(10, now);

        let err = sub.renew(SubscriptionPlan::Trial, None, now).unwrap_err();

        assert_eq!(err.code, ErrorCode::InvalidPlan);
    }

    #[test]
    fn renew_rearms_the_reminder() {
        let now = Timestamp::now();
        let mut sub = active_until(3, now);
        sub.mark_reminder_sent(now);

        sub.renew(SubscriptionPlan::Monthly, None, now).unwrap();

        assert!(sub.reminder_sent_at.is_none());
    }

    #[test]
    fn stale_active_status_is_not_trusted() {
        let now = Timestamp::now();
        let sub = active_until(-1, now);

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(!sub.is_active(now));
        assert_eq!(sub.days_remaining(now), 0);
    }

    #[test]
    fn expire_if_lapsed_runs_once() {
        let now = Timestamp::now();
        let mut sub = active_until(-1, now);

        assert!(sub.expire_if_lapsed(now));
        assert!(!sub.expire_if_lapsed(now));
        assert_eq!(sub.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn reminder_window_is_seven_days() {
        let now = Timestamp::now();

        assert!(active_until(7, now).needs_reminder(now));
        assert!(!active_until(8, now).needs_reminder(now));
        assert!(!active_until(-1, now).needs_reminder(now));
    }

    #[test]
    fn public_status_mirrors_activity() {
        let status = PublicSubscriptionStatus::from_active(false);
        assert!(!status.can_contact && !status.show_images);
    }
}
