//! Domain layer containing business rules and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `payment` - Payment lifecycle, amount rules and typed purposes
//! - `subscription` - Provider billing periods and renewal anchoring
//! - `contact` - Inbound messages, masking and unlock entitlements
//! - `provider` - Listing visibility and promotion windows

pub mod contact;
pub mod foundation;
pub mod payment;
pub mod provider;
pub mod subscription;
