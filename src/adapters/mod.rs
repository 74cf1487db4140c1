//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `encryption` - Field-level PII encryption and the encrypting contact store
//! - `gateways` - CinetPay, NotchPay and a scripted mock
//! - `http` - axum routers
//! - `memory` - In-process repositories for tests and local runs
//! - `notifications` - Resend email and a recording sender
//! - `postgres` - sqlx repositories

pub mod encryption;
pub mod gateways;
pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
