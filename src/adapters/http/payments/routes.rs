//! Axum router configuration for payment endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{cinetpay_webhook, initialize_payment, notchpay_webhook, payment_status};

/// Create the payment API router, mounted at `/payments`.
///
/// # Routes
///
/// - `POST /initialize` - Open a checkout
/// - `GET /:transaction_id/status` - Status with on-demand reconciliation
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /webhook` - CinetPay notifications
/// - `POST /notchpay/webhook` - NotchPay events
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(initialize_payment))
        .route("/:transaction_id/status", get(payment_status))
        .route("/webhook", post(cinetpay_webhook))
        .route("/notchpay/webhook", post(notchpay_webhook))
}
