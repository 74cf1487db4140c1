//! PaymentCheckout - opens a payment at a gateway.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, ProviderId, Timestamp, UserId};
use crate::domain::payment::{GatewayKind, GatewayResult, NewPayment, Payment, PaymentPurpose};
use crate::ports::{GatewayRegistry, Payer};

use super::PaymentLedger;

/// Command to start a payment.
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub purpose: PaymentPurpose,
    pub amount: i64,
    /// `None` uses the configured default gateway.
    pub gateway: Option<GatewayKind>,
    pub user_id: Option<UserId>,
    pub provider_id: Option<ProviderId>,
    pub description: Option<String>,
    pub payer: Payer,
}

/// A stored payment plus where the customer completes it.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub payment_url: String,
}

/// Creates the payment row, then asks the gateway for a checkout.
///
/// A failed initiation is not retried: the payment is marked REFUSED with
/// the gateway's message and the caller gets `GatewayError`.
pub struct PaymentCheckout {
    ledger: Arc<PaymentLedger>,
    gateways: GatewayRegistry,
    currency: String,
}

impl PaymentCheckout {
    pub fn new(ledger: Arc<PaymentLedger>, gateways: GatewayRegistry, currency: impl Into<String>) -> Self {
        Self {
            ledger,
            gateways,
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn initiate(&self, cmd: InitiatePaymentCommand) -> Result<InitiatedPayment, DomainError> {
        let gateway = match cmd.gateway {
            Some(kind) => self.gateways.get(kind)?,
            None => self.gateways.default_gateway()?,
        };

        let mut payment = self
            .ledger
            .create(NewPayment {
                purpose: cmd.purpose,
                amount: cmd.amount,
                currency: self.currency.clone(),
                gateway: gateway.kind(),
                user_id: cmd.user_id,
                provider_id: cmd.provider_id,
                description: cmd.description,
            })
            .await?;

        match gateway.initiate(&payment, &cmd.payer).await {
            Ok(session) => {
                payment.attach_checkout(
                    session.payment_token,
                    Some(session.payment_url.clone()),
                    Timestamp::now(),
                );
                self.ledger.save_checkout(&payment).await?;
                Ok(InitiatedPayment {
                    payment,
                    payment_url: session.payment_url,
                })
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = %payment.transaction_id,
                    gateway = %gateway.kind(),
                    error = %e,
                    "Payment initiation failed"
                );
                self.ledger
                    .apply_gateway_result(&payment, &GatewayResult::refused(e.to_string()))
                    .await?;
                Err(DomainError::gateway(e.to_string())
                    .with_detail("transactionId", payment.transaction_id))
            }
        }
    }
}
