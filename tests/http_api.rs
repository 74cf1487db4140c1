//! HTTP wiring tests: requests go through `api_router` with the in-memory
//! service graph behind it.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Harness;
use marketplace_core::adapters::http::{api_router, AppState};
use marketplace_core::domain::foundation::{ProviderId, UserId};

fn router(h: &Harness) -> Router {
    api_router(AppState::from(&h.services))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn as_provider(
    builder: http::request::Builder,
    user_id: UserId,
    provider_id: ProviderId,
) -> http::request::Builder {
    builder
        .header("x-user-id", user_id.to_string())
        .header("x-user-role", "provider")
        .header("x-provider-id", provider_id.to_string())
}

#[tokio::test]
async fn health_returns_ok() {
    let h = Harness::new();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let response = router(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn initialize_rejects_unknown_payment_type() {
    let h = Harness::new();
    let body = json!({ "amount": 1000, "type": "lottery" });
    let request = post_json("/payments/initialize", &body);

    let (status, body) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_PAYMENT_TYPE");
}

#[tokio::test]
async fn initialize_rejects_subscription_at_wrong_price() {
    let h = Harness::new();
    let (provider_id, _) = h.add_provider();
    let body = json!({
        "amount": 4000,
        "type": "subscription",
        "plan": "monthly",
        "providerId": provider_id,
    });
    let request = post_json("/payments/initialize", &body);

    let (status, body) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_AMOUNT");
}

#[tokio::test]
async fn initialize_boost_opens_checkout() {
    let h = Harness::new();
    let (provider_id, _) = h.add_provider();
    let body = json!({
        "amount": 2000,
        "type": "boost",
        "days": 7,
        "providerId": provider_id,
    });
    let request = post_json("/payments/initialize", &body);

    let (status, body) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"], 2000);
    assert_eq!(body["currency"], "XAF");
    assert!(body["paymentUrl"].as_str().unwrap().starts_with("https://"));
    assert_eq!(h.gateway.initiated().len(), 1);
}

#[tokio::test]
async fn webhook_for_unknown_transaction_is_acknowledged() {
    let h = Harness::new();
    let payload = json!({ "transactionId": "TX-DOES-NOT-EXIST", "status": "ACCEPTED" });
    let request = post_json("/payments/webhook", &payload);

    let response = router(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_with_malformed_body_is_rejected() {
    let h = Harness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/payments/webhook")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = router(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payment_status_requires_identity() {
    let h = Harness::new();
    let request = Request::builder()
        .uri("/payments/TX-1/status")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn public_status_of_unknown_provider_is_inactive() {
    let h = Harness::new();
    let request = Request::builder()
        .uri(format!("/subscriptions/provider/{}/status", ProviderId::new()))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);
    assert_eq!(body["canContact"], false);
}

#[tokio::test]
async fn my_subscription_is_forbidden_without_provider_profile() {
    let h = Harness::new();
    let request = Request::builder()
        .uri("/subscriptions/my")
        .header("x-user-id", UserId::new().to_string())
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inbox_masks_contacts_without_subscription() {
    let h = Harness::new();
    let (provider_id, user_id) = h.add_provider();

    let create = json!({
        "providerId": provider_id,
        "message": "Hello, I would like a quote for a wedding dress.",
        "senderName": "Aline",
        "senderEmail": "aline@example.com",
        "senderPhone": "+237677000000",
    });
    let request = post_json("/contacts", &create);
    let (status, _) = send(router(&h), request).await;
    assert_eq!(status, StatusCode::CREATED);

    let request = as_provider(Request::builder().uri("/contacts"), user_id, provider_id)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::OK);
    let contacts = body.as_array().unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["needsUnlock"], true);
    assert_ne!(contacts[0]["senderEmail"], "aline@example.com");
}

#[tokio::test]
async fn inbox_of_other_provider_is_forbidden() {
    let h = Harness::new();
    let (provider_id, _) = h.add_provider();
    let (other_provider, other_user) = h.add_provider();

    let request = as_provider(
        Request::builder().uri(format!("/contacts?providerId={}", provider_id)),
        other_user,
        other_provider,
    )
    .body(Body::empty())
    .unwrap();
    let (status, _) = send(router(&h), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
