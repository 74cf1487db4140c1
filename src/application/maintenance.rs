//! Entry points for the external scheduler.
//!
//! Each sweep is idempotent and can be run as often as the scheduler likes.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::subscription::Subscription;
use crate::ports::{EmailMessage, NotificationSender, ProviderDirectory};

use super::{PaymentLedger, SubscriptionManager};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderReport {
    pub sent: usize,
    pub failed: usize,
    /// No contact email on the listing; left for the next run.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub expired_subscriptions: u64,
    pub expired_payments: u64,
    pub reminders: ReminderReport,
}

pub struct Maintenance {
    subscriptions: Arc<SubscriptionManager>,
    ledger: Arc<PaymentLedger>,
    directory: Arc<dyn ProviderDirectory>,
    notifier: Arc<dyn NotificationSender>,
    pending_payment_ttl_minutes: i64,
}

impl Maintenance {
    pub fn new(
        subscriptions: Arc<SubscriptionManager>,
        ledger: Arc<PaymentLedger>,
        directory: Arc<dyn ProviderDirectory>,
        notifier: Arc<dyn NotificationSender>,
        pending_payment_ttl_minutes: i64,
    ) -> Self {
        Self {
            subscriptions,
            ledger,
            directory,
            notifier,
            pending_payment_ttl_minutes,
        }
    }

    pub async fn expire_subscriptions(&self) -> Result<u64, DomainError> {
        self.subscriptions.expire_old_subscriptions().await
    }

    /// Expires open payments older than the configured time-to-live.
    pub async fn expire_stale_payments(&self) -> Result<u64, DomainError> {
        let cutoff = Timestamp::now().minus_minutes(self.pending_payment_ttl_minutes);
        let count = self.ledger.expire_stale(cutoff).await?;
        if count > 0 {
            tracing::info!(count, "Expired stale pending payments");
        }
        Ok(count)
    }

    /// Emails every provider whose subscription ends within the reminder
    /// window. A failed send leaves the row unmarked so the next run retries
    /// it; other rows are unaffected.
    pub async fn send_expiry_reminders(&self) -> Result<ReminderReport, DomainError> {
        let mut report = ReminderReport::default();
        let now = Timestamp::now();

        for subscription in self.subscriptions.get_expiring_soon().await? {
            let listing = self.directory.find(&subscription.provider_id).await?;
            let Some((name, to)) =
                listing.and_then(|l| l.contact_email.map(|email| (l.display_name, email)))
            else {
                report.skipped += 1;
                continue;
            };

            match self.notifier.send(reminder_email(to, &name, &subscription, now)).await {
                Ok(()) => {
                    self.subscriptions.mark_reminder_sent(&subscription.id).await?;
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %subscription.provider_id,
                        error = %e,
                        "Renewal reminder not delivered"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(sent = report.sent, failed = report.failed, skipped = report.skipped, "Reminder sweep done");
        Ok(report)
    }

    pub async fn run_all(&self) -> Result<MaintenanceReport, DomainError> {
        Ok(MaintenanceReport {
            expired_subscriptions: self.expire_subscriptions().await?,
            expired_payments: self.expire_stale_payments().await?,
            reminders: self.send_expiry_reminders().await?,
        })
    }
}

fn reminder_email(to: String, name: &str, subscription: &Subscription, now: Timestamp) -> EmailMessage {
    let days = subscription.days_remaining(now);
    let plan = subscription.plan.display_name();
    let end = subscription.end_date.as_datetime().format("%Y-%m-%d");
    EmailMessage {
        to,
        subject: format!("Your {} plan ends in {} day(s)", plan, days),
        html: format!(
            "<p>Hello {},</p><p>Your {} plan ends on <strong>{}</strong>. \
             Renew now to keep your contact details and photos visible.</p>",
            name, plan, end
        ),
        text: format!(
            "Hello {},\n\nYour {} plan ends on {}. Renew now to keep your contact details and photos visible.\n",
            name, plan, end
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::MockGateway;
    use crate::adapters::memory::{
        InMemoryPaymentRepository, InMemoryProviderDirectory, InMemorySubscriptionRepository,
    };
    use crate::adapters::notifications::RecordingNotificationSender;
    use crate::application::PaymentCheckout;
    use crate::domain::foundation::{ProviderId, UserId};
    use crate::domain::payment::GatewayKind;
    use crate::domain::provider::ProviderListing;
    use crate::ports::GatewayRegistry;

    struct Fixture {
        maintenance: Maintenance,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        directory: Arc<InMemoryProviderDirectory>,
        mailer: Arc<RecordingNotificationSender>,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(PaymentLedger::new(Arc::new(InMemoryPaymentRepository::new())));
        let registry = GatewayRegistry::new(GatewayKind::CinetPay)
            .with(Arc::new(MockGateway::new(GatewayKind::CinetPay)));
        let checkout = Arc::new(PaymentCheckout::new(ledger.clone(), registry, "XAF"));
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let manager = Arc::new(SubscriptionManager::new(subscriptions.clone(), checkout));
        let directory = Arc::new(InMemoryProviderDirectory::new());
        let mailer = Arc::new(RecordingNotificationSender::new());
        Fixture {
            maintenance: Maintenance::new(manager, ledger, directory.clone(), mailer.clone(), 60),
            subscriptions,
            directory,
            mailer,
        }
    }

    fn ending_in(days: i64, provider_id: ProviderId) -> Subscription {
        let now = Timestamp::now();
        let mut sub = Subscription::create_trial(provider_id, now.minus_days(30 - days));
        sub.end_date = now.add_days(days);
        sub
    }

    fn listing(id: ProviderId, email: Option<&str>) -> ProviderListing {
        ProviderListing {
            id,
            user_id: UserId::new(),
            display_name: "Atelier Mbarga".to_string(),
            contact_email: email.map(str::to_string),
            is_visible: true,
            featured_until: None,
            boosted_until: None,
        }
    }

    #[tokio::test]
    async fn reminders_are_sent_once_per_period() {
        let f = fixture();
        let provider = ProviderId::new();
        f.directory.add(listing(provider, Some("atelier@example.cm")));
        f.subscriptions.put(ending_in(3, provider));

        let first = f.maintenance.send_expiry_reminders().await.unwrap();
        let second = f.maintenance.send_expiry_reminders().await.unwrap();

        assert_eq!(first.sent, 1);
        assert_eq!(second.sent, 0);
        assert_eq!(f.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_reminder_is_retried_next_run() {
        let f = fixture();
        let provider = ProviderId::new();
        f.directory.add(listing(provider, Some("atelier@example.cm")));
        f.subscriptions.put(ending_in(3, provider));
        f.mailer.fail_with("rate limited");

        let report = f.maintenance.send_expiry_reminders().await.unwrap();
        assert_eq!(report.failed, 1);

        f.mailer.recover();
        let report = f.maintenance.send_expiry_reminders().await.unwrap();
        assert_eq!(report.sent, 1);
    }

    #[tokio::test]
    async fn listing_without_email_is_skipped() {
        let f = fixture();
        let provider = ProviderId::new();
        f.directory.add(listing(provider, None));
        f.subscriptions.put(ending_in(2, provider));

        let report = f.maintenance.send_expiry_reminders().await.unwrap();

        assert_eq!(report.skipped, 1);
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn run_all_is_idempotent() {
        let f = fixture();
        f.subscriptions.put(ending_in(-2, ProviderId::new()));

        let first = f.maintenance.run_all().await.unwrap();
        let second = f.maintenance.run_all().await.unwrap();

        assert_eq!(first.expired_subscriptions, 1);
        assert_eq!(second, MaintenanceReport::default());
    }
}
