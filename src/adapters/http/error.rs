//! Conversion of domain errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode};

/// JSON error body returned by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: HashMap::new(),
        }
    }
}

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

/// Status code for a domain error code.
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed
        | ErrorCode::InvalidAmount
        | ErrorCode::InvalidPaymentType
        | ErrorCode::InvalidPlan => StatusCode::BAD_REQUEST,
        c if c.is_not_found() => StatusCode::NOT_FOUND,
        c if c.is_conflict() => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized | ErrorCode::InvalidWebhookSignature => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::GatewayError => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.code);

        let body = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(code = %self.0.code, error = %self.0.message, "Request failed");
            ErrorResponse::new(self.0.code.to_string(), "Internal server error")
        } else {
            ErrorResponse {
                code: self.0.code.to_string(),
                message: self.0.message,
                details: self.0.details,
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_conflicts_are_bad_requests() {
        assert_eq!(status_for(ErrorCode::AlreadyUnlocked), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::PaymentNotConfirmed), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::SubscriptionExists), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_resources_are_not_found() {
        assert_eq!(status_for(ErrorCode::PaymentNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorCode::ContactNotFound), StatusCode::NOT_FOUND);
    }

    #[test]
    fn gateway_failures_are_bad_gateway() {
        assert_eq!(status_for(ErrorCode::GatewayError), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn access_errors_are_distinguished() {
        assert_eq!(status_for(ErrorCode::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorCode::Unauthorized), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn storage_failures_hide_their_message() {
        let response = ApiError(DomainError::database("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
