//! Shared application state for all HTTP handlers.

use std::sync::Arc;

use crate::application::{
    ContactGate, PaymentCheckout, PaymentLedger, Services, SubscriptionManager, WebhookDispatcher,
};

/// Cloned per request; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<PaymentCheckout>,
    pub ledger: Arc<PaymentLedger>,
    pub subscriptions: Arc<SubscriptionManager>,
    pub contacts: Arc<ContactGate>,
    pub webhooks: Arc<WebhookDispatcher>,
}

impl From<&Services> for AppState {
    fn from(services: &Services) -> Self {
        Self {
            checkout: services.checkout.clone(),
            ledger: services.ledger.clone(),
            subscriptions: services.subscriptions.clone(),
            contacts: services.contacts.clone(),
            webhooks: services.webhooks.clone(),
        }
    }
}
