//! Wiring of the application services over a set of adapters.
//!
//! Used by the binary with the Postgres adapters and by the tests with
//! the in-memory ones, so both run the same object graph.

use std::sync::Arc;

use crate::ports::{
    ContactRepository, GatewayRegistry, NotificationSender, PaymentRepository, ProviderDirectory,
    SubscriptionRepository, UnlockedContactRepository,
};

use super::{
    ContactGate, Maintenance, PaymentCheckout, PaymentFulfillment, PaymentLedger,
    SubscriptionManager, WebhookDispatcher,
};

/// Storage adapters the services run on.
#[derive(Clone)]
pub struct Repositories {
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    /// Must already encrypt sender PII when backed by real storage.
    pub contacts: Arc<dyn ContactRepository>,
    pub unlocks: Arc<dyn UnlockedContactRepository>,
    pub directory: Arc<dyn ProviderDirectory>,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub currency: String,
    pub contact_unlock_price: i64,
    pub pending_expiry_minutes: i64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            currency: "XAF".to_string(),
            contact_unlock_price: 1000,
            pending_expiry_minutes: 60,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub ledger: Arc<PaymentLedger>,
    pub checkout: Arc<PaymentCheckout>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub contacts: Arc<ContactGate>,
    pub fulfillment: Arc<PaymentFulfillment>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub maintenance: Arc<Maintenance>,
}

impl Services {
    pub fn wire(
        repositories: Repositories,
        gateways: GatewayRegistry,
        notifier: Arc<dyn NotificationSender>,
        settings: ServiceSettings,
    ) -> Self {
        let ledger = Arc::new(PaymentLedger::new(repositories.payments));
        let checkout = Arc::new(PaymentCheckout::new(
            ledger.clone(),
            gateways.clone(),
            settings.currency,
        ));
        let subscriptions = Arc::new(SubscriptionManager::new(
            repositories.subscriptions,
            checkout.clone(),
        ));
        let contacts = Arc::new(ContactGate::new(
            repositories.contacts,
            repositories.unlocks,
            subscriptions.clone(),
            checkout.clone(),
            ledger.clone(),
            settings.contact_unlock_price,
        ));
        let fulfillment = Arc::new(PaymentFulfillment::new(
            subscriptions.clone(),
            contacts.clone(),
            repositories.directory.clone(),
            notifier.clone(),
        ));
        let webhooks = Arc::new(WebhookDispatcher::new(
            gateways,
            ledger.clone(),
            fulfillment.clone(),
        ));
        let maintenance = Arc::new(Maintenance::new(
            subscriptions.clone(),
            ledger.clone(),
            repositories.directory,
            notifier,
            settings.pending_expiry_minutes,
        ));

        Self {
            ledger,
            checkout,
            subscriptions,
            contacts,
            fulfillment,
            webhooks,
            maintenance,
        }
    }
}
