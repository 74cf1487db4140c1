//! Application layer - services that orchestrate domain operations.
//!
//! ## Payments
//! - `PaymentLedger` - create payments, apply gateway results
//! - `PaymentCheckout` - open a checkout at a gateway
//! - `WebhookDispatcher` - inbound webhooks and status polling
//! - `PaymentFulfillment` - effects of accepted/refused payments
//!
//! ## Subscriptions and contacts
//! - `SubscriptionManager` - trials, renewals, expiry
//! - `ContactGate` - masked or full contact views, unlocks
//!
//! ## Scheduling
//! - `Maintenance` - sweeps invoked by an external scheduler

mod contact_gate;
mod fulfillment;
mod maintenance;
mod payment_checkout;
mod payment_ledger;
mod services;
mod subscription_manager;
mod webhook_dispatcher;

pub use contact_gate::ContactGate;
pub use fulfillment::PaymentFulfillment;
pub use maintenance::{Maintenance, MaintenanceReport, ReminderReport};
pub use payment_checkout::{InitiatePaymentCommand, InitiatedPayment, PaymentCheckout};
pub use payment_ledger::{LedgerUpdate, PaymentLedger};
pub use services::{Repositories, ServiceSettings, Services};
pub use subscription_manager::{SubscribeCommand, SubscriptionManager};
pub use webhook_dispatcher::{WebhookDispatcher, WebhookError, WebhookOutcome};
