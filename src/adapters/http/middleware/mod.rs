//! HTTP middleware for axum.
//!
//! - `auth` - Caller identity extractors

pub mod auth;

pub use auth::{viewer_from_headers, AuthRejection, OptionalViewer, RequireViewer};
