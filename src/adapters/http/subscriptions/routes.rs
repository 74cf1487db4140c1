//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{my_subscription, provider_status, subscribe};

/// Create the subscription API router, mounted at `/subscriptions`.
///
/// # Routes
///
/// ## Provider Endpoints (require a provider identity)
/// - `GET /my` - Plan, dates and days remaining
/// - `POST /subscribe` - Start a plan payment
///
/// ## Public Endpoints
/// - `GET /provider/:id/status` - `{isActive, canContact, showImages}`
pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/my", get(my_subscription))
        .route("/subscribe", post(subscribe))
        .route("/provider/:id/status", get(provider_status))
}
