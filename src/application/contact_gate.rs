//! ContactGate - decides who sees a sender's real details.
//!
//! Decision order for [`ContactGate::can_view`]:
//!
//! 1. admins always see everything
//! 2. an already unlocked contact stays unlocked
//! 3. an active provider subscription unlocks the contact and the unlock is
//!    written back
//! 4. an unexpired entitlement for (sender, provider) does the same
//!
//! A write-back is permanent. A later lapse only stops new unlocks.

use std::sync::Arc;

use crate::domain::contact::{
    Contact, ContactView, FullContact, MaskedContact, NewContact, UnlockType, UnlockedContact,
    Viewer,
};
use crate::domain::foundation::{
    ContactId, DomainError, ErrorCode, PaymentId, ProviderId, Timestamp,
};
use crate::domain::payment::{GatewayKind, PaymentPurpose, PaymentStatus};
use crate::ports::{ContactRepository, Payer, SaveResult, UnlockedContactRepository};

use super::{InitiatePaymentCommand, InitiatedPayment, PaymentCheckout, PaymentLedger, SubscriptionManager};

pub struct ContactGate {
    contacts: Arc<dyn ContactRepository>,
    unlocks: Arc<dyn UnlockedContactRepository>,
    subscriptions: Arc<SubscriptionManager>,
    checkout: Arc<PaymentCheckout>,
    ledger: Arc<PaymentLedger>,
    unlock_price: i64,
}

impl ContactGate {
    /// `contacts` must be the encrypting repository in production wiring;
    /// the gate itself only ever sees plaintext.
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        unlocks: Arc<dyn UnlockedContactRepository>,
        subscriptions: Arc<SubscriptionManager>,
        checkout: Arc<PaymentCheckout>,
        ledger: Arc<PaymentLedger>,
        unlock_price: i64,
    ) -> Self {
        Self {
            contacts,
            unlocks,
            subscriptions,
            checkout,
            ledger,
            unlock_price,
        }
    }

    pub fn unlock_price(&self) -> i64 {
        self.unlock_price
    }

    pub async fn create(&self, new: NewContact) -> Result<Contact, DomainError> {
        let contact = Contact::create(new, Timestamp::now())?;
        self.contacts.insert(&contact).await?;

        tracing::info!(contact_id = %contact.id, provider_id = %contact.provider_id, "Contact received");
        Ok(contact)
    }

    /// Whether `viewer` may see the real sender details of `contact`.
    ///
    /// May unlock `contact` as a side effect; the passed value is updated to
    /// match what was stored.
    pub async fn can_view(&self, contact: &mut Contact, viewer: &Viewer) -> Result<bool, DomainError> {
        if viewer.is_admin() || contact.is_unlocked {
            return Ok(true);
        }

        if self.subscriptions.is_active(&contact.provider_id).await? {
            self.persist_unlock(contact, None).await?;
            tracing::debug!(contact_id = %contact.id, "Unlocked by active subscription");
            return Ok(true);
        }

        if let Some(user_id) = contact.user_id {
            let now = Timestamp::now();
            if let Some(grant) = self.unlocks.find(&user_id, &contact.provider_id).await? {
                if grant.is_valid(now) {
                    self.persist_unlock(contact, grant.payment_id).await?;
                    tracing::debug!(
                        contact_id = %contact.id,
                        unlock_type = %grant.unlock_type,
                        "Unlocked by entitlement"
                    );
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    pub fn masked_view(&self, contact: &Contact) -> MaskedContact {
        MaskedContact::new(contact, self.unlock_price)
    }

    /// One contact as its owner (or an admin) may see it.
    ///
    /// # Errors
    ///
    /// - `ContactNotFound`
    /// - `Forbidden` if the viewer neither owns the provider nor is admin
    pub async fn view(&self, contact_id: &ContactId, viewer: &Viewer) -> Result<ContactView, DomainError> {
        let mut contact = self.find_for(contact_id, viewer).await?;
        self.render(&mut contact, viewer).await
    }

    /// The provider's inbox, newest first, each message through the gate.
    pub async fn list_for_provider(
        &self,
        provider_id: ProviderId,
        viewer: &Viewer,
    ) -> Result<Vec<ContactView>, DomainError> {
        ensure_access(provider_id, viewer)?;

        let contacts = self.contacts.list_for_provider(&provider_id).await?;
        let mut views = Vec::with_capacity(contacts.len());
        for mut contact in contacts {
            views.push(self.render(&mut contact, viewer).await?);
        }
        Ok(views)
    }

    /// Opens a payment for unlocking one contact.
    ///
    /// # Errors
    ///
    /// - `AlreadyUnlocked` if the viewer can already see the details
    pub async fn initiate_unlock(
        &self,
        contact_id: &ContactId,
        viewer: &Viewer,
        gateway: Option<GatewayKind>,
        payer: Payer,
    ) -> Result<InitiatedPayment, DomainError> {
        let mut contact = self.find_for(contact_id, viewer).await?;
        if self.can_view(&mut contact, viewer).await? {
            return Err(DomainError::conflict(
                ErrorCode::AlreadyUnlocked,
                "Contact is already unlocked",
            ));
        }

        self.checkout
            .initiate(InitiatePaymentCommand {
                purpose: PaymentPurpose::ContactUnlock {
                    contact_id: contact.id,
                },
                amount: self.unlock_price,
                gateway,
                user_id: viewer.user_id,
                provider_id: Some(contact.provider_id),
                description: None,
                payer,
            })
            .await
    }

    /// Unlocks a contact once its unlock payment is ACCEPTED.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` for an unknown transaction id
    /// - `PaymentNotConfirmed` unless the payment is ACCEPTED and was made
    ///   for this contact
    pub async fn confirm_unlock(
        &self,
        contact_id: &ContactId,
        viewer: &Viewer,
        transaction_id: &str,
    ) -> Result<Contact, DomainError> {
        let contact = self.find_for(contact_id, viewer).await?;
        let payment = self.ledger.find_by_transaction_id(transaction_id).await?;

        if payment.status != PaymentStatus::Accepted {
            return Err(DomainError::conflict(
                ErrorCode::PaymentNotConfirmed,
                format!("Payment is {}", payment.status),
            ));
        }
        if payment.purpose()? != (PaymentPurpose::ContactUnlock { contact_id: contact.id }) {
            return Err(DomainError::conflict(
                ErrorCode::PaymentNotConfirmed,
                "Payment was not made for this contact",
            ));
        }

        self.apply_paid_unlock(&contact.id, payment.id).await
    }

    /// Unlocks a contact paid for by `payment_id` and records a paid
    /// entitlement for its sender. Repeat calls change nothing.
    pub async fn apply_paid_unlock(
        &self,
        contact_id: &ContactId,
        payment_id: PaymentId,
    ) -> Result<Contact, DomainError> {
        let mut contact = self.require(contact_id).await?;
        self.persist_unlock(&mut contact, Some(payment_id)).await?;
        self.record_entitlement(&contact, UnlockType::Paid, Some(payment_id), None)
            .await?;
        Ok(contact)
    }

    /// Admin-only unlock without payment.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the viewer is an admin
    /// - `ValidationFailed` unless `unlock_type` is `free` or `promo`
    pub async fn admin_grant(
        &self,
        contact_id: &ContactId,
        viewer: &Viewer,
        unlock_type: UnlockType,
        expires_at: Option<Timestamp>,
    ) -> Result<Contact, DomainError> {
        if !viewer.is_admin() {
            return Err(DomainError::new(ErrorCode::Forbidden, "Admin role required"));
        }
        if !unlock_type.is_grantable() {
            return Err(DomainError::validation(
                "unlockType",
                format!("'{}' cannot be granted", unlock_type),
            ));
        }

        let mut contact = self.require(contact_id).await?;
        self.persist_unlock(&mut contact, None).await?;
        self.record_entitlement(&contact, unlock_type, None, expires_at)
            .await?;

        tracing::info!(contact_id = %contact.id, %unlock_type, "Contact unlock granted");
        Ok(contact)
    }

    async fn render(&self, contact: &mut Contact, viewer: &Viewer) -> Result<ContactView, DomainError> {
        if self.can_view(contact, viewer).await? {
            Ok(ContactView::Full(FullContact::from(&*contact)))
        } else {
            Ok(ContactView::Masked(self.masked_view(contact)))
        }
    }

    async fn persist_unlock(
        &self,
        contact: &mut Contact,
        payment_id: Option<PaymentId>,
    ) -> Result<(), DomainError> {
        if contact.is_unlocked {
            return Ok(());
        }
        let now = Timestamp::now();
        if !self.contacts.mark_unlocked(&contact.id, now, payment_id).await? {
            // Someone else unlocked it first; take the stored values.
            *contact = self.require(&contact.id).await?;
            return Ok(());
        }
        contact.unlock(payment_id, now);
        Ok(())
    }

    async fn record_entitlement(
        &self,
        contact: &Contact,
        unlock_type: UnlockType,
        payment_id: Option<PaymentId>,
        expires_at: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        let Some(user_id) = contact.user_id else {
            return Ok(());
        };
        let grant = UnlockedContact::new(
            user_id,
            contact.provider_id,
            unlock_type,
            payment_id,
            expires_at,
            Timestamp::now(),
        );
        if self.unlocks.insert(&grant).await? == SaveResult::AlreadyExists {
            tracing::debug!(user_id = %user_id, provider_id = %contact.provider_id, "Entitlement already present");
        }
        Ok(())
    }

    async fn require(&self, contact_id: &ContactId) -> Result<Contact, DomainError> {
        self.contacts
            .find_by_id(contact_id)
            .await?
            .ok_or_else(|| DomainError::not_found(ErrorCode::ContactNotFound, "Contact not found"))
    }

    async fn find_for(&self, contact_id: &ContactId, viewer: &Viewer) -> Result<Contact, DomainError> {
        let contact = self.require(contact_id).await?;
        ensure_access(contact.provider_id, viewer)?;
        Ok(contact)
    }
}

fn ensure_access(provider_id: ProviderId, viewer: &Viewer) -> Result<(), DomainError> {
    if viewer.is_admin() || viewer.owns(provider_id) {
        Ok(())
    } else {
        Err(DomainError::new(
            ErrorCode::Forbidden,
            "Contact belongs to another provider",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::MockGateway;
    use crate::adapters::memory::{
        InMemoryContactRepository, InMemoryPaymentRepository, InMemorySubscriptionRepository,
        InMemoryUnlockedContactRepository,
    };
    use crate::domain::foundation::UserId;
    use crate::domain::payment::GatewayResult;
    use crate::domain::subscription::Subscription;
    use crate::ports::GatewayRegistry;

    struct Fixture {
        gate: ContactGate,
        ledger: Arc<PaymentLedger>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        unlocks: Arc<InMemoryUnlockedContactRepository>,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(PaymentLedger::new(Arc::new(InMemoryPaymentRepository::new())));
        let registry = GatewayRegistry::new(GatewayKind::CinetPay)
            .with(Arc::new(MockGateway::new(GatewayKind::CinetPay)));
        let checkout = Arc::new(PaymentCheckout::new(ledger.clone(), registry, "XAF"));
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let manager = Arc::new(SubscriptionManager::new(subscriptions.clone(), checkout.clone()));
        let unlocks = Arc::new(InMemoryUnlockedContactRepository::new());
        let gate = ContactGate::new(
            Arc::new(InMemoryContactRepository::new()),
            unlocks.clone(),
            manager,
            checkout,
            ledger.clone(),
            1000,
        );
        Fixture {
            gate,
            ledger,
            subscriptions,
            unlocks,
        }
    }

    fn lapsed_subscription(provider_id: ProviderId) -> Subscription {
        let now = Timestamp::now();
        let mut sub = Subscription::create_trial(provider_id, now.minus_days(40));
        sub.end_date = now.minus_days(10);
        sub
    }

    fn new_contact(provider_id: ProviderId) -> NewContact {
        NewContact {
            user_id: Some(UserId::new()),
            provider_id,
            message: "Need a plumber on Saturday".to_string(),
            sender_name: "John Doe".to_string(),
            sender_email: "john.doe@example.com".to_string(),
            sender_phone: Some("+237 6 99 00 11 22".to_string()),
        }
    }

    #[tokio::test]
    async fn locked_contact_is_masked_for_owner() {
        let f = fixture();
        let provider = ProviderId::new();
        f.subscriptions.put(lapsed_subscription(provider));
        let contact = f.gate.create(new_contact(provider)).await.unwrap();
        let owner = Viewer::provider(UserId::new(), provider);

        let view = f.gate.view(&contact.id, &owner).await.unwrap();

        match view {
            ContactView::Masked(masked) => {
                assert_eq!(masked.sender_email, "j***@***");
                assert_eq!(masked.unlock_price, 1000);
            }
            ContactView::Full(_) => panic!("expected masked view"),
        }
    }

    #[tokio::test]
    async fn other_provider_is_forbidden() {
        let f = fixture();
        let contact = f.gate.create(new_contact(ProviderId::new())).await.unwrap();
        let stranger = Viewer::provider(UserId::new(), ProviderId::new());

        let err = f.gate.view(&contact.id, &stranger).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn admin_sees_without_unlocking() {
        let f = fixture();
        let provider = ProviderId::new();
        f.subscriptions.put(lapsed_subscription(provider));
        let mut contact = f.gate.create(new_contact(provider)).await.unwrap();

        assert!(f.gate.can_view(&mut contact, &Viewer::admin(UserId::new())).await.unwrap());
        assert!(!contact.is_unlocked);
    }

    #[tokio::test]
    async fn unlock_requires_accepted_payment() {
        let f = fixture();
        let provider = ProviderId::new();
        f.subscriptions.put(lapsed_subscription(provider));
        let contact = f.gate.create(new_contact(provider)).await.unwrap();
        let owner = Viewer::provider(UserId::new(), provider);

        let initiated = f
            .gate
            .initiate_unlock(&contact.id, &owner, None, Payer::default())
            .await
            .unwrap();
        let tx = initiated.payment.transaction_id.clone();

        let err = f.gate.confirm_unlock(&contact.id, &owner, &tx).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentNotConfirmed);

        f.ledger
            .apply_gateway_result(&initiated.payment, &GatewayResult::accepted(1000))
            .await
            .unwrap();
        let unlocked = f.gate.confirm_unlock(&contact.id, &owner, &tx).await.unwrap();

        assert!(unlocked.is_unlocked);
        assert_eq!(unlocked.unlock_payment_id, Some(initiated.payment.id));
        let grant = f
            .unlocks
            .find(&contact.user_id.unwrap(), &provider)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.unlock_type, UnlockType::Paid);

        let err = f
            .gate
            .initiate_unlock(&contact.id, &owner, None, Payer::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyUnlocked);
    }

    #[tokio::test]
    async fn payment_for_another_contact_does_not_unlock() {
        let f = fixture();
        let provider = ProviderId::new();
        f.subscriptions.put(lapsed_subscription(provider));
        let first = f.gate.create(new_contact(provider)).await.unwrap();
        let second = f.gate.create(new_contact(provider)).await.unwrap();
        let owner = Viewer::provider(UserId::new(), provider);

        let initiated = f
            .gate
            .initiate_unlock(&first.id, &owner, None, Payer::default())
            .await
            .unwrap();
        f.ledger
            .apply_gateway_result(&initiated.payment, &GatewayResult::accepted(1000))
            .await
            .unwrap();

        let err = f
            .gate
            .confirm_unlock(&second.id, &owner, &initiated.payment.transaction_id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentNotConfirmed);
    }

    #[tokio::test]
    async fn entitlement_unlocks_later_messages_from_same_sender() {
        let f = fixture();
        let provider = ProviderId::new();
        f.subscriptions.put(lapsed_subscription(provider));
        let sender = UserId::new();
        let first = f
            .gate
            .create(NewContact {
                user_id: Some(sender),
                ..new_contact(provider)
            })
            .await
            .unwrap();
        let admin = Viewer::admin(UserId::new());
        f.gate
            .admin_grant(&first.id, &admin, UnlockType::Promo, None)
            .await
            .unwrap();

        let second = f
            .gate
            .create(NewContact {
                user_id: Some(sender),
                ..new_contact(provider)
            })
            .await
            .unwrap();
        let owner = Viewer::provider(UserId::new(), provider);

        assert!(!f.gate.view(&second.id, &owner).await.unwrap().is_masked());
    }

    #[tokio::test]
    async fn paid_unlock_replaces_expired_entitlement() {
        let f = fixture();
        let provider = ProviderId::new();
        f.subscriptions.put(lapsed_subscription(provider));
        let sender = UserId::new();
        let from_sender = || NewContact {
            user_id: Some(sender),
            ..new_contact(provider)
        };
        let owner = Viewer::provider(UserId::new(), provider);

        let first = f.gate.create(from_sender()).await.unwrap();
        f.gate
            .admin_grant(
                &first.id,
                &Viewer::admin(UserId::new()),
                UnlockType::Promo,
                Some(Timestamp::now().minus_days(1)),
            )
            .await
            .unwrap();

        let second = f.gate.create(from_sender()).await.unwrap();
        let initiated = f
            .gate
            .initiate_unlock(&second.id, &owner, None, Payer::default())
            .await
            .unwrap();
        f.ledger
            .apply_gateway_result(&initiated.payment, &GatewayResult::accepted(1000))
            .await
            .unwrap();
        f.gate
            .confirm_unlock(&second.id, &owner, &initiated.payment.transaction_id)
            .await
            .unwrap();

        let grant = f.unlocks.find(&sender, &provider).await.unwrap().unwrap();
        assert_eq!(grant.unlock_type, UnlockType::Paid);
        assert!(grant.is_valid(Timestamp::now()));

        let third = f.gate.create(from_sender()).await.unwrap();
        assert!(!f.gate.view(&third.id, &owner).await.unwrap().is_masked());
    }

    #[tokio::test]
    async fn valid_entitlement_is_not_replaced() {
        let f = fixture();
        let provider = ProviderId::new();
        let sender = UserId::new();
        let grant = UnlockedContact::new(
            sender,
            provider,
            UnlockType::Free,
            None,
            None,
            Timestamp::now(),
        );
        assert_eq!(f.unlocks.insert(&grant).await.unwrap(), SaveResult::Inserted);

        let later = UnlockedContact::new(
            sender,
            provider,
            UnlockType::Paid,
            Some(PaymentId::new()),
            None,
            Timestamp::now(),
        );
        assert_eq!(f.unlocks.insert(&later).await.unwrap(), SaveResult::AlreadyExists);
        let stored = f.unlocks.find(&sender, &provider).await.unwrap().unwrap();
        assert_eq!(stored.unlock_type, UnlockType::Free);
    }

    #[tokio::test]
    async fn admin_grant_rejects_paid_type_and_non_admins() {
        let f = fixture();
        let provider = ProviderId::new();
        let contact = f.gate.create(new_contact(provider)).await.unwrap();

        let err = f
            .gate
            .admin_grant(&contact.id, &Viewer::admin(UserId::new()), UnlockType::Paid, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = f
            .gate
            .admin_grant(
                &contact.id,
                &Viewer::provider(UserId::new(), provider),
                UnlockType::Free,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
