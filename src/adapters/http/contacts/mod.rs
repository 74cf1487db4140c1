//! HTTP adapter for contact endpoints.
//!
//! Sender details only leave this adapter through the gate: owners get the
//! full or masked view the gate decides on.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::contact_routes;
