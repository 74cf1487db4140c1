//! PaymentFulfillment - what an accepted or refused payment does.
//!
//! Receives the ledger's terminal events and matches on the typed purpose.
//! Emails go out last and a failed send is only logged.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, Timestamp};
use crate::domain::payment::{PaymentAccepted, PaymentEvent, PaymentPurpose, PaymentRefused};
use crate::domain::provider::{extend_promotion, ProviderListing};
use crate::ports::{EmailMessage, NotificationSender, ProviderDirectory};

use super::{ContactGate, SubscriptionManager};

pub struct PaymentFulfillment {
    subscriptions: Arc<SubscriptionManager>,
    contacts: Arc<ContactGate>,
    directory: Arc<dyn ProviderDirectory>,
    notifier: Arc<dyn NotificationSender>,
}

impl PaymentFulfillment {
    pub fn new(
        subscriptions: Arc<SubscriptionManager>,
        contacts: Arc<ContactGate>,
        directory: Arc<dyn ProviderDirectory>,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            subscriptions,
            contacts,
            directory,
            notifier,
        }
    }

    pub async fn handle(&self, event: &PaymentEvent) -> Result<(), DomainError> {
        match event {
            PaymentEvent::Accepted(accepted) => self.on_accepted(accepted).await,
            PaymentEvent::Refused(refused) => {
                self.on_refused(refused).await;
                Ok(())
            }
        }
    }

    async fn on_accepted(&self, event: &PaymentAccepted) -> Result<(), DomainError> {
        let now = Timestamp::now();

        match event.purpose {
            PaymentPurpose::ContactPremium { .. } => {}
            PaymentPurpose::Featured { days } => {
                let listing = self.listing(event.provider_id).await?;
                let until = extend_promotion(listing.featured_until, days, now);
                self.directory.set_featured_until(&listing.id, until).await?;
                tracing::info!(provider_id = %listing.id, until = %until, "Featured window extended");
            }
            PaymentPurpose::Boost { days } => {
                let listing = self.listing(event.provider_id).await?;
                let until = extend_promotion(listing.boosted_until, days, now);
                self.directory.set_boosted_until(&listing.id, until).await?;
                tracing::info!(provider_id = %listing.id, until = %until, "Boost window extended");
            }
            PaymentPurpose::Subscription { plan } => {
                let provider_id = require_provider(event.provider_id)?;
                self.subscriptions
                    .renew(provider_id, plan, Some(event.payment_id))
                    .await?;
                self.directory.set_visibility(&provider_id, true).await?;
            }
            PaymentPurpose::ContactUnlock { contact_id } => {
                self.contacts
                    .apply_paid_unlock(&contact_id, event.payment_id)
                    .await?;
            }
        }

        if let Some(listing) = self.find_listing(event.provider_id).await {
            if let Some(to) = listing.contact_email.clone() {
                self.notify(receipt_email(to, &listing, event)).await;
            }
        }
        Ok(())
    }

    async fn on_refused(&self, event: &PaymentRefused) {
        tracing::info!(
            transaction_id = %event.transaction_id,
            reason = %event.reason,
            "Payment refused"
        );
        if let Some(listing) = self.find_listing(event.provider_id).await {
            if let Some(to) = listing.contact_email.clone() {
                self.notify(refusal_email(to, &listing, event)).await;
            }
        }
    }

    async fn listing(&self, provider_id: Option<ProviderId>) -> Result<ProviderListing, DomainError> {
        let provider_id = require_provider(provider_id)?;
        self.directory
            .find(&provider_id)
            .await?
            .ok_or_else(|| DomainError::not_found(ErrorCode::ProviderNotFound, "Provider not found"))
    }

    /// Lookup for notifications only; errors are logged, never returned.
    async fn find_listing(&self, provider_id: Option<ProviderId>) -> Option<ProviderListing> {
        let provider_id = provider_id?;
        match self.directory.find(&provider_id).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(provider_id = %provider_id, error = %e, "Provider lookup for email failed");
                None
            }
        }
    }

    async fn notify(&self, message: EmailMessage) {
        let subject = message.subject.clone();
        if let Err(e) = self.notifier.send(message).await {
            tracing::warn!(subject = %subject, error = %e, "Email not delivered");
        }
    }
}

fn require_provider(provider_id: Option<ProviderId>) -> Result<ProviderId, DomainError> {
    provider_id.ok_or_else(|| DomainError::validation("providerId", "Payment has no provider"))
}

fn receipt_email(to: String, listing: &ProviderListing, event: &PaymentAccepted) -> EmailMessage {
    let what = event.purpose.payment_type().label();
    EmailMessage {
        to,
        subject: format!("Payment received: {}", what),
        html: format!(
            "<p>Hello {},</p><p>We received your payment of <strong>{} {}</strong> for {}.</p>\
             <p>Reference: {}</p>",
            listing.display_name, event.amount, event.currency, what, event.transaction_id
        ),
        text: format!(
            "Hello {},\n\nWe received your payment of {} {} for {}.\nReference: {}\n",
            listing.display_name, event.amount, event.currency, what, event.transaction_id
        ),
    }
}

fn refusal_email(to: String, listing: &ProviderListing, event: &PaymentRefused) -> EmailMessage {
    EmailMessage {
        to,
        subject: "Payment failed".to_string(),
        html: format!(
            "<p>Hello {},</p><p>Your payment {} did not go through: {}.</p>\
             <p>No money was taken. You can try again at any time.</p>",
            listing.display_name, event.transaction_id, event.reason
        ),
        text: format!(
            "Hello {},\n\nYour payment {} did not go through: {}.\nNo money was taken. You can try again at any time.\n",
            listing.display_name, event.transaction_id, event.reason
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::MockGateway;
    use crate::adapters::memory::{
        InMemoryContactRepository, InMemoryPaymentRepository, InMemoryProviderDirectory,
        InMemorySubscriptionRepository, InMemoryUnlockedContactRepository,
    };
    use crate::adapters::notifications::RecordingNotificationSender;
    use crate::application::{PaymentCheckout, PaymentLedger};
    use crate::domain::foundation::{PaymentId, UserId};
    use crate::domain::payment::{GatewayKind, PaymentType};
    use crate::domain::subscription::SubscriptionPlan;
    use crate::ports::GatewayRegistry;

    struct Fixture {
        fulfillment: PaymentFulfillment,
        directory: Arc<InMemoryProviderDirectory>,
        mailer: Arc<RecordingNotificationSender>,
        provider: ProviderId,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(PaymentLedger::new(Arc::new(InMemoryPaymentRepository::new())));
        let registry = GatewayRegistry::new(GatewayKind::CinetPay)
            .with(Arc::new(MockGateway::new(GatewayKind::CinetPay)));
        let checkout = Arc::new(PaymentCheckout::new(ledger.clone(), registry, "XAF"));
        let manager = Arc::new(SubscriptionManager::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            checkout.clone(),
        ));
        let gate = Arc::new(ContactGate::new(
            Arc::new(InMemoryContactRepository::new()),
            Arc::new(InMemoryUnlockedContactRepository::new()),
            manager.clone(),
            checkout,
            ledger,
            1000,
        ));
        let directory = Arc::new(InMemoryProviderDirectory::new());
        let provider = ProviderId::new();
        directory.add(ProviderListing {
            id: provider,
            user_id: UserId::new(),
            display_name: "Ngono Plumbing".to_string(),
            contact_email: Some("owner@example.cm".to_string()),
            is_visible: false,
            featured_until: None,
            boosted_until: None,
        });
        let mailer = Arc::new(RecordingNotificationSender::new());
        Fixture {
            fulfillment: PaymentFulfillment::new(manager, gate, directory.clone(), mailer.clone()),
            directory,
            mailer,
            provider,
        }
    }

    fn accepted(provider: ProviderId, purpose: PaymentPurpose, amount: i64) -> PaymentEvent {
        PaymentEvent::Accepted(PaymentAccepted {
            payment_id: PaymentId::new(),
            transaction_id: "TXN1".to_string(),
            purpose,
            provider_id: Some(provider),
            user_id: None,
            amount,
            currency: "XAF".to_string(),
        })
    }

    #[tokio::test]
    async fn boost_extends_window_and_sends_receipt() {
        let f = fixture();

        f.fulfillment
            .handle(&accepted(f.provider, PaymentPurpose::Boost { days: 7 }, 2000))
            .await
            .unwrap();

        let listing = f.directory.find(&f.provider).await.unwrap().unwrap();
        let until = listing.boosted_until.unwrap();
        assert_eq!(until.duration_since(&Timestamp::now()).num_days(), 6);
        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains(PaymentType::Boost.label()));
    }

    #[tokio::test]
    async fn subscription_without_row_fails() {
        let f = fixture();

        let err = f
            .fulfillment
            .handle(&accepted(
                f.provider,
                PaymentPurpose::Subscription {
                    plan: SubscriptionPlan::Monthly,
                },
                5000,
            ))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
        assert!(f.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn refusal_sends_notice() {
        let f = fixture();

        f.fulfillment
            .handle(&PaymentEvent::Refused(PaymentRefused {
                payment_id: PaymentId::new(),
                transaction_id: "TXN2".to_string(),
                provider_id: Some(f.provider),
                user_id: None,
                reason: "insufficient funds".to_string(),
            }))
            .await
            .unwrap();

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("insufficient funds"));
    }

    #[tokio::test]
    async fn failing_mailer_does_not_fail_fulfillment() {
        let f = fixture();
        f.mailer.fail_with("smtp down");

        let result = f
            .fulfillment
            .handle(&accepted(f.provider, PaymentPurpose::Featured { days: 30 }, 5000))
            .await;

        assert!(result.is_ok());
        let listing = f.directory.find(&f.provider).await.unwrap().unwrap();
        assert!(listing.featured_until.is_some());
    }
}
