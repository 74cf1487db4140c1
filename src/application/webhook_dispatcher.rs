//! WebhookDispatcher - inbound gateway notifications and status polling.
//!
//! Both paths end in the same place: a normalized result applied by the
//! ledger and, on a terminal transition, handed to fulfillment. Unknown
//! vendor statuses never move a payment.

use std::sync::Arc;

use http::HeaderMap;
use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::domain::payment::{GatewayKind, GatewayNotification, Payment, PaymentStatus};
use crate::ports::{GatewayError, GatewayRegistry, PaymentGateway};

use super::{PaymentFulfillment, PaymentLedger};

/// Why a webhook delivery was not processed.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook: {0}")]
    Malformed(String),

    #[error("unknown transaction {0}")]
    UnknownTransaction(String),

    #[error(transparent)]
    Processing(#[from] DomainError),
}

impl From<GatewayError> for WebhookError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidSignature => WebhookError::InvalidSignature,
            other => WebhookError::Malformed(other.to_string()),
        }
    }
}

/// What a processed delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The payment moved to `status`.
    Applied {
        transaction_id: String,
        status: PaymentStatus,
    },
    /// Recognized but not applicable; the payment stays at `status`.
    Unchanged {
        transaction_id: String,
        status: PaymentStatus,
    },
    /// The vendor status is not in the gateway's table.
    UnknownStatus {
        transaction_id: String,
        raw_status: String,
    },
    /// The delivery named a transaction without a status. The caller
    /// schedules [`WebhookDispatcher::reconcile`] after acknowledging.
    NeedsReconcile { transaction_id: String },
}

pub struct WebhookDispatcher {
    gateways: GatewayRegistry,
    ledger: Arc<PaymentLedger>,
    fulfillment: Arc<PaymentFulfillment>,
}

impl WebhookDispatcher {
    pub fn new(
        gateways: GatewayRegistry,
        ledger: Arc<PaymentLedger>,
        fulfillment: Arc<PaymentFulfillment>,
    ) -> Self {
        Self {
            gateways,
            ledger,
            fulfillment,
        }
    }

    /// Verifies, parses and applies one delivery from gateway `kind`.
    pub async fn handle(
        &self,
        kind: GatewayKind,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<WebhookOutcome, WebhookError> {
        let gateway = self.gateways.get(kind)?;
        let notification = gateway.parse_webhook(body, headers).map_err(|e| {
            tracing::warn!(gateway = %kind, error = %e, "Webhook rejected");
            WebhookError::from(e)
        })?;

        let payment = self
            .ledger
            .find_optional(&notification.transaction_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    gateway = %kind,
                    transaction_id = %notification.transaction_id,
                    "Webhook for unknown transaction"
                );
                WebhookError::UnknownTransaction(notification.transaction_id.clone())
            })?;

        if notification.raw_status.is_none() {
            return Ok(WebhookOutcome::NeedsReconcile {
                transaction_id: payment.transaction_id,
            });
        }
        Ok(self.apply(gateway.as_ref(), payment, notification).await?)
    }

    /// Polls the payment's gateway while the payment is still open and
    /// applies what it reports. Returns the payment as stored afterwards.
    ///
    /// A gateway failure is logged and the stored payment returned as is.
    pub async fn reconcile(&self, transaction_id: &str) -> Result<Payment, DomainError> {
        let payment = self.ledger.find_by_transaction_id(transaction_id).await?;
        if !payment.status.is_open() {
            return Ok(payment);
        }

        let gateway = self.gateways.get(payment.gateway)?;
        let notification = match gateway.check_status(&payment).await {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction_id,
                    gateway = %payment.gateway,
                    error = %e,
                    "Status check failed"
                );
                return Ok(payment);
            }
        };
        if notification.raw_status.is_none() {
            return Ok(payment);
        }

        self.apply(gateway.as_ref(), payment, notification).await?;
        self.ledger.find_by_transaction_id(transaction_id).await
    }

    async fn apply(
        &self,
        gateway: &dyn PaymentGateway,
        payment: Payment,
        notification: GatewayNotification,
    ) -> Result<WebhookOutcome, DomainError> {
        let raw_status = notification.raw_status.clone().unwrap_or_default();
        let Some(status) = gateway.normalize_status(&raw_status) else {
            tracing::warn!(
                gateway = %gateway.kind(),
                transaction_id = %payment.transaction_id,
                raw_status = %raw_status,
                "Unrecognized gateway status, payment left unchanged"
            );
            return Ok(WebhookOutcome::UnknownStatus {
                transaction_id: payment.transaction_id,
                raw_status,
            });
        };

        let update = self
            .ledger
            .apply_gateway_result(&payment, &notification.into_result(status))
            .await?;

        if let Some(event) = &update.event {
            if let Err(e) = self.fulfillment.handle(event).await {
                tracing::error!(
                    transaction_id = %update.payment.transaction_id,
                    error = %e,
                    "Payment fulfillment failed"
                );
            }
        }

        let transaction_id = update.payment.transaction_id;
        let status = update.payment.status;
        if status == payment.status {
            Ok(WebhookOutcome::Unchanged {
                transaction_id,
                status,
            })
        } else {
            Ok(WebhookOutcome::Applied {
                transaction_id,
                status,
            })
        }
    }
}
