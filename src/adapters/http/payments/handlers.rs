//! HTTP handlers for payment endpoints.

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{InitiatePaymentCommand, WebhookError, WebhookOutcome};
use crate::domain::contact::Viewer;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::payment::{GatewayKind, Payment, PaymentPurpose, PaymentType};

use super::super::error::{ApiError, ErrorResponse};
use super::super::middleware::{OptionalViewer, RequireViewer};
use super::super::state::AppState;
use super::dto::{InitializePaymentRequest, InitiatedPaymentResponse, PaymentStatusResponse};

/// POST /payments/initialize - Open a checkout for a listing purchase
pub async fn initialize_payment(
    State(state): State<AppState>,
    OptionalViewer(viewer): OptionalViewer,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let payment_type: PaymentType = request.payment_type.parse()?;
    if payment_type == PaymentType::ContactUnlock {
        return Err(DomainError::new(
            ErrorCode::InvalidPaymentType,
            "Contact unlocks are started from the contact",
        )
        .with_detail("field", "type")
        .into());
    }

    let purpose = PaymentPurpose::from_parts(payment_type, &request.metadata())?;
    if let PaymentPurpose::Subscription { plan } = purpose {
        if request.amount != plan.price() {
            return Err(DomainError::new(
                ErrorCode::InvalidAmount,
                format!("The {} plan costs {}", plan, plan.price()),
            )
            .with_detail("field", "amount")
            .into());
        }
    }

    let initiated = state
        .checkout
        .initiate(InitiatePaymentCommand {
            purpose,
            amount: request.amount,
            gateway: request.gateway,
            user_id: viewer.user_id,
            provider_id: request.provider_id,
            description: request.description,
            payer: request.payer.into_payer(&viewer),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitiatedPaymentResponse::from(initiated)),
    ))
}

/// GET /payments/:transactionId/status - Current status, polling the
/// gateway first while the payment is still open
pub async fn payment_status(
    State(state): State<AppState>,
    RequireViewer(viewer): RequireViewer,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state.ledger.find_by_transaction_id(&transaction_id).await?;
    if !may_see(&viewer, &payment) {
        return Err(DomainError::new(ErrorCode::Forbidden, "Not your payment").into());
    }

    let payment = state.webhooks.reconcile(&transaction_id).await?;
    Ok(Json(PaymentStatusResponse::from(payment)))
}

/// POST /payments/webhook - CinetPay notification
///
/// Acknowledged with `200 OK` once parsed, whatever happens next. Only a
/// bad signature or an unparseable body gets a non-200.
pub async fn cinetpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state
        .webhooks
        .handle(GatewayKind::CinetPay, &body, &headers)
        .await
    {
        Ok(outcome) => {
            schedule_reconcile(&state, &outcome);
            (StatusCode::OK, "OK").into_response()
        }
        Err(WebhookError::InvalidSignature) => invalid_signature(),
        Err(WebhookError::Malformed(reason)) => malformed(reason),
        Err(WebhookError::UnknownTransaction(transaction_id)) => {
            tracing::debug!(gateway = "cinetpay", %transaction_id, "Acknowledged unknown transaction");
            (StatusCode::OK, "OK").into_response()
        }
        Err(WebhookError::Processing(e)) => {
            tracing::error!(gateway = "cinetpay", error = %e, "Webhook processing failed");
            (StatusCode::OK, "OK").into_response()
        }
    }
}

/// POST /payments/notchpay/webhook - NotchPay event
pub async fn notchpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state
        .webhooks
        .handle(GatewayKind::NotchPay, &body, &headers)
        .await
    {
        Ok(outcome) => {
            schedule_reconcile(&state, &outcome);
            StatusCode::OK.into_response()
        }
        Err(WebhookError::InvalidSignature) => invalid_signature(),
        Err(WebhookError::Malformed(reason)) => malformed(reason),
        Err(WebhookError::UnknownTransaction(reference)) => ApiError(DomainError::not_found(
            ErrorCode::PaymentNotFound,
            format!("Unknown reference {}", reference),
        ))
        .into_response(),
        Err(WebhookError::Processing(e)) => {
            tracing::error!(gateway = "notchpay", error = %e, "Webhook processing failed");
            StatusCode::OK.into_response()
        }
    }
}

fn may_see(viewer: &Viewer, payment: &Payment) -> bool {
    viewer.is_admin()
        || (payment.user_id.is_some() && payment.user_id == viewer.user_id)
        || payment.provider_id.map_or(false, |p| viewer.owns(p))
}

/// Runs the status poll after the delivery has been acknowledged.
fn schedule_reconcile(state: &AppState, outcome: &WebhookOutcome) {
    if let WebhookOutcome::NeedsReconcile { transaction_id } = outcome {
        let webhooks = state.webhooks.clone();
        let transaction_id = transaction_id.clone();
        tokio::spawn(async move {
            if let Err(e) = webhooks.reconcile(&transaction_id).await {
                tracing::error!(
                    transaction_id = %transaction_id,
                    error = %e,
                    "Reconciliation after webhook failed"
                );
            }
        });
    }
}

fn invalid_signature() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(
            ErrorCode::InvalidWebhookSignature.to_string(),
            "Invalid webhook signature",
        )),
    )
        .into_response()
}

fn malformed(reason: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(ErrorCode::ValidationFailed.to_string(), reason)),
    )
        .into_response()
}
