//! HTTP handlers for contact endpoints.

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::contact::{FullContact, NewContact};
use crate::domain::foundation::{ContactId, DomainError, Timestamp};

use super::super::error::ApiError;
use super::super::middleware::{OptionalViewer, RequireViewer};
use super::super::payments::InitiatedPaymentResponse;
use super::super::state::AppState;
use super::dto::{
    ConfirmUnlockRequest, ContactCreatedResponse, CreateContactRequest, GrantUnlockRequest,
    InboxQuery, UnlockRequest,
};

/// POST /contacts - Send a message to a provider
pub async fn create_contact(
    State(state): State<AppState>,
    OptionalViewer(viewer): OptionalViewer,
    Json(request): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .contacts
        .create(NewContact {
            user_id: viewer.user_id,
            provider_id: request.provider_id,
            message: request.message,
            sender_name: request.sender_name,
            sender_email: request.sender_email,
            sender_phone: request.sender_phone,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ContactCreatedResponse::from(&contact)),
    ))
}

/// GET /contacts - The caller's inbox, each message full or masked
pub async fn list_contacts(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Query(query): Query<InboxQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let provider_id = query
        .provider_id
        .or(viewer.provider_id)
        .ok_or_else(|| DomainError::validation("providerId", "providerId is required"))?;

    let views = state.contacts.list_for_provider(provider_id, &viewer).await?;
    Ok(Json(views))
}

/// GET /contacts/:id - One message through the gate
pub async fn get_contact(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(contact_id): Path<ContactId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.contacts.view(&contact_id, &viewer).await?;
    Ok(Json(view))
}

/// POST /contacts/:id/unlock - Open an unlock payment
pub async fn unlock_contact(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(contact_id): Path<ContactId>,
    request: Option<Json<UnlockRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let initiated = state
        .contacts
        .initiate_unlock(
            &contact_id,
            &viewer,
            request.gateway,
            request.payer.into_payer(&viewer),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitiatedPaymentResponse::from(initiated)),
    ))
}

/// POST /contacts/:id/unlock/confirm - Unlock once the payment is accepted
pub async fn confirm_unlock(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(contact_id): Path<ContactId>,
    Json(request): Json<ConfirmUnlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .contacts
        .confirm_unlock(&contact_id, &viewer, &request.transaction_id)
        .await?;
    Ok(Json(FullContact::from(&contact)))
}

/// POST /contacts/:id/grant - Admin unlock without payment
pub async fn grant_unlock(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(contact_id): Path<ContactId>,
    Json(request): Json<GrantUnlockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = state
        .contacts
        .admin_grant(
            &contact_id,
            &viewer,
            request.unlock_type,
            request.expires_at.map(Timestamp::from_datetime),
        )
        .await?;
    Ok(Json(FullContact::from(&contact)))
}
