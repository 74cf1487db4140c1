//! Marketplace Core - payments, provider subscriptions and contact gating
//!
//! This crate implements the monetization side of a services marketplace:
//! gateway-backed payments, provider subscription periods and the
//! pay-to-see gate on inbound contact messages.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
