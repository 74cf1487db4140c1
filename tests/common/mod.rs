//! Shared fixture: the full service graph over in-memory adapters.

#![allow(dead_code)]

use std::sync::Arc;

use http::HeaderMap;
use serde_json::json;

use marketplace_core::adapters::gateways::MockGateway;
use marketplace_core::adapters::memory::{
    InMemoryContactRepository, InMemoryPaymentRepository, InMemoryProviderDirectory,
    InMemorySubscriptionRepository, InMemoryUnlockedContactRepository,
};
use marketplace_core::adapters::notifications::RecordingNotificationSender;
use marketplace_core::application::{
    InitiatedPayment, Repositories, ServiceSettings, Services, WebhookOutcome,
};
use marketplace_core::domain::foundation::{ProviderId, UserId};
use marketplace_core::domain::payment::GatewayKind;
use marketplace_core::domain::provider::ProviderListing;
use marketplace_core::ports::GatewayRegistry;

pub struct Harness {
    pub services: Services,
    pub payments: Arc<InMemoryPaymentRepository>,
    pub subscriptions: Arc<InMemorySubscriptionRepository>,
    pub contacts: Arc<InMemoryContactRepository>,
    pub unlocks: Arc<InMemoryUnlockedContactRepository>,
    pub directory: Arc<InMemoryProviderDirectory>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<RecordingNotificationSender>,
}

impl Harness {
    pub fn new() -> Self {
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let contacts = Arc::new(InMemoryContactRepository::new());
        let unlocks = Arc::new(InMemoryUnlockedContactRepository::new());
        let directory = Arc::new(InMemoryProviderDirectory::new());
        let gateway = Arc::new(MockGateway::new(GatewayKind::CinetPay));
        let notifier = Arc::new(RecordingNotificationSender::new());

        let services = Services::wire(
            Repositories {
                payments: payments.clone(),
                subscriptions: subscriptions.clone(),
                contacts: contacts.clone(),
                unlocks: unlocks.clone(),
                directory: directory.clone(),
            },
            GatewayRegistry::new(GatewayKind::CinetPay).with(gateway.clone()),
            notifier.clone(),
            ServiceSettings::default(),
        );

        Self {
            services,
            payments,
            subscriptions,
            contacts,
            unlocks,
            directory,
            gateway,
            notifier,
        }
    }

    /// Registers a hidden listing owned by a fresh user.
    pub fn add_provider(&self) -> (ProviderId, UserId) {
        let provider_id = ProviderId::new();
        let user_id = UserId::new();
        self.directory.add(ProviderListing {
            id: provider_id,
            user_id,
            display_name: "Atelier Ngono".to_string(),
            contact_email: Some("owner@example.com".to_string()),
            is_visible: false,
            featured_until: None,
            boosted_until: None,
        });
        (provider_id, user_id)
    }

    /// Delivers a mock webhook for `initiated` with `status`.
    pub async fn deliver(&self, initiated: &InitiatedPayment, status: &str) -> WebhookOutcome {
        let body = json!({
            "transactionId": initiated.payment.transaction_id,
            "status": status,
            "amount": initiated.payment.amount,
        });
        self.services
            .webhooks
            .handle(
                GatewayKind::CinetPay,
                body.to_string().as_bytes(),
                &HeaderMap::new(),
            )
            .await
            .unwrap()
    }
}
