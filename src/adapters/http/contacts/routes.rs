//! Axum router configuration for contact endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::super::state::AppState;
use super::handlers::{
    confirm_unlock, create_contact, get_contact, grant_unlock, list_contacts, unlock_contact,
};

/// Create the contact API router, mounted at `/contacts`.
///
/// # Routes
///
/// - `POST /` - Send a message (anonymous allowed)
/// - `GET /` - Provider inbox
/// - `GET /:id` - One message
/// - `POST /:id/unlock` - Start an unlock payment
/// - `POST /:id/unlock/confirm` - Apply an accepted unlock payment
///
/// ## Admin Endpoints
/// - `POST /:id/grant` - Free or promo unlock
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_contact).get(list_contacts))
        .route("/:id", get(get_contact))
        .route("/:id/unlock", post(unlock_contact))
        .route("/:id/unlock/confirm", post(confirm_unlock))
        .route("/:id/grant", post(grant_unlock))
}
