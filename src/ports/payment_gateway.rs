//! Payment gateway port.
//!
//! One implementation per external gateway. Each folds its own status
//! vocabulary into [`NormalizedStatus`] so that adding a gateway needs no
//! change in the ledger or in fulfillment.
//!
//! # Design
//!
//! - **Unknown statuses**: `normalize_status` returns `None`; the caller
//!   leaves the payment untouched
//! - **Signatures first**: `parse_webhook` verifies before it parses and
//!   reports a bad signature as [`GatewayError::InvalidSignature`]
//! - **Timeouts**: every outbound call carries a request timeout

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::payment::{GatewayKind, GatewayNotification, NormalizedStatus, Payment};
use async_trait::async_trait;
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Who pays, as far as the gateway needs to know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payer {
    pub user_id: Option<UserId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Where to send the customer to complete a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub payment_url: String,
    pub payment_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Webhook signature missing or wrong. Maps to 401, never to the
    /// always-200 acknowledgement.
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed gateway payload: {0}")]
    Parse(String),

    #[error("gateway unreachable: {0}")]
    Network(String),

    #[error("gateway rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("gateway not configured: {0}")]
    NotConfigured(String),
}

impl GatewayError {
    pub fn parse(message: impl Into<String>) -> Self {
        GatewayError::Parse(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        GatewayError::Network(message.into())
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidSignature => {
                DomainError::new(ErrorCode::InvalidWebhookSignature, err.to_string())
            }
            GatewayError::Parse(_) => DomainError::validation("payload", err.to_string()),
            _ => DomainError::gateway(err.to_string()),
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Maps a raw gateway status. `None` means unrecognized.
    fn normalize_status(&self, raw_status: &str) -> Option<NormalizedStatus>;

    /// Gateway-specific initiation payload for `payment`.
    fn build_initiate_request(
        &self,
        payment: &Payment,
        payer: &Payer,
    ) -> Result<serde_json::Value, GatewayError>;

    /// Opens a checkout at the gateway.
    async fn initiate(&self, payment: &Payment, payer: &Payer)
        -> Result<CheckoutSession, GatewayError>;

    /// Asks the gateway for the current state of `payment`.
    async fn check_status(&self, payment: &Payment) -> Result<GatewayNotification, GatewayError>;

    /// Verifies and parses a webhook delivery.
    fn parse_webhook(
        &self,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<GatewayNotification, GatewayError>;
}

/// Configured gateways, keyed by kind.
#[derive(Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<GatewayKind, Arc<dyn PaymentGateway>>,
    default_kind: GatewayKind,
}

impl GatewayRegistry {
    pub fn new(default_kind: GatewayKind) -> Self {
        Self {
            gateways: HashMap::new(),
            default_kind,
        }
    }

    pub fn with(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    pub fn default_kind(&self) -> GatewayKind {
        self.default_kind
    }

    /// # Errors
    ///
    /// `GatewayError` if `kind` was not registered.
    pub fn get(&self, kind: GatewayKind) -> Result<Arc<dyn PaymentGateway>, DomainError> {
        self.gateways
            .get(&kind)
            .cloned()
            .ok_or_else(|| GatewayError::NotConfigured(kind.to_string()).into())
    }

    pub fn default_gateway(&self) -> Result<Arc<dyn PaymentGateway>, DomainError> {
        self.get(self.default_kind)
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("gateways", &self.gateways.keys().collect::<Vec<_>>())
            .field("default_kind", &self.default_kind)
            .finish()
    }
}
