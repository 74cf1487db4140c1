//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `PaymentRepository` - Payment rows with conditional status updates
//! - `SubscriptionRepository` - One subscription row per provider
//! - `ContactRepository` / `UnlockedContactRepository` - Messages and entitlements
//! - `ProviderDirectory` - Listing visibility and promotion windows
//!
//! ## External Service Ports
//!
//! - `PaymentGateway` - Checkout initiation, status polling, webhook parsing
//! - `NotificationSender` - Fire-and-forget email

mod contact_repository;
mod notification_sender;
mod payment_gateway;
mod payment_repository;
mod provider_directory;
mod subscription_repository;

pub use contact_repository::{ContactRepository, SaveResult, UnlockedContactRepository};
pub use notification_sender::{EmailMessage, NotificationError, NotificationSender};
pub use payment_gateway::{
    CheckoutSession, GatewayError, GatewayRegistry, Payer, PaymentGateway,
};
pub use payment_repository::PaymentRepository;
pub use provider_directory::ProviderDirectory;
pub use subscription_repository::SubscriptionRepository;
