//! HTTP handlers for subscription endpoints.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::SubscribeCommand;
use crate::domain::contact::Viewer;
use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, UserId};

use super::super::error::ApiError;
use super::super::middleware::RequireViewer;
use super::super::payments::InitiatedPaymentResponse;
use super::super::state::AppState;
use super::dto::SubscribeRequest;

/// GET /subscriptions/my - Owner view of the caller's subscription
pub async fn my_subscription(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
) -> Result<impl IntoResponse, ApiError> {
    let (_, provider_id) = provider_identity(&viewer)?;
    let summary = state.subscriptions.get_status(&provider_id).await?;
    Ok(Json(summary))
}

/// POST /subscriptions/subscribe - Pay for a plan
pub async fn subscribe(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_id, provider_id) = provider_identity(&viewer)?;

    let initiated = state
        .subscriptions
        .subscribe(SubscribeCommand {
            provider_id,
            user_id,
            plan: request.plan,
            gateway: request.gateway,
            payer: request.payer.into_payer(&viewer),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitiatedPaymentResponse::from(initiated)),
    ))
}

/// GET /subscriptions/provider/:id/status - Public privileges of a provider
pub async fn provider_status(
    State(state): State<AppState>,
    Path(provider_id): Path<ProviderId>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.subscriptions.public_status(&provider_id).await?;
    Ok(Json(status))
}

fn provider_identity(viewer: &Viewer) -> Result<(UserId, ProviderId), DomainError> {
    match (viewer.user_id, viewer.provider_id) {
        (Some(user_id), Some(provider_id)) => Ok((user_id, provider_id)),
        _ => Err(DomainError::new(
            ErrorCode::Forbidden,
            "A provider profile is required",
        )),
    }
}
