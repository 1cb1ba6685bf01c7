//! Request validation and auth guard tests. Every request here is rejected
//! before any query runs, so no database is required.

mod common;

use axum::http::{Method, StatusCode};
use common::{offline_app, TEST_JWT_SECRET};
use serde_json::json;
use service_core::middleware::auth::{issue_token, AuthClaims};
use uuid::Uuid;

fn token(secret: &str) -> String {
    let claims = AuthClaims {
        sub: "cashier-1".to_string(),
        role: Some("CASHIER".to_string()),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    issue_token(secret.as_bytes(), &claims).unwrap()
}

#[tokio::test]
async fn test_list_limit_above_maximum_is_rejected() {
    let app = offline_app(None);

    let response = app.get("/api/v1/bills?limit=101").await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_unknown_sort_column_is_rejected() {
    let app = offline_app(None);

    let response = app
        .get("/api/v1/payments?sortBy=payment_amount;DROP%20TABLE%20payments")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("paymentDate"));
}

#[tokio::test]
async fn test_payment_without_bills_is_rejected() {
    let app = offline_app(None);

    let response = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": Uuid::new_v4(),
                "billIds": [],
                "paymentAmount": "100.00",
                "paymentMethod": "CASH"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_card_payment_without_reference_is_rejected() {
    let app = offline_app(None);

    let response = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": Uuid::new_v4(),
                "billIds": [Uuid::new_v4()],
                "paymentAmount": "100.00",
                "paymentMethod": "CARD_TERMINAL"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "Validation error");
}

#[tokio::test]
async fn test_payment_with_fractional_cents_is_rejected() {
    let app = offline_app(None);

    for amount in ["999.995", "0.004"] {
        let response = app
            .post(
                "/api/v1/payments/cashier/record-payment",
                json!({
                    "customerId": Uuid::new_v4(),
                    "billIds": [Uuid::new_v4()],
                    "paymentAmount": amount,
                    "paymentMethod": "CASH"
                }),
            )
            .await;

        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", amount);
        assert!(response.body["details"]
            .as_str()
            .unwrap()
            .contains("payment_amount"));
    }
}

#[tokio::test]
async fn test_negative_charge_is_rejected() {
    let app = offline_app(None);

    let response = app
        .post(
            "/api/v1/bills",
            json!({
                "customerId": Uuid::new_v4(),
                "meterId": Uuid::new_v4(),
                "billingPeriodStart": "2024-01-01",
                "billingPeriodEnd": "2024-01-31",
                "energyChargeAmount": "-1",
                "dueDate": "2024-02-15"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reconciliation_band_below_threshold_is_rejected() {
    let app = offline_app(None);

    let response = app
        .post(
            "/api/v1/payments/reconciliation",
            json!({
                "startDate": "2024-03-01",
                "endDate": "2024-03-31",
                "expected": {"CASH": "100"},
                "thresholdPercent": "8",
                "reviewBandPercent": "4"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_api_requires_token_when_secret_configured() {
    let app = offline_app(Some(TEST_JWT_SECRET));

    let missing = app.get("/api/v1/customers").await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let forged = app
        .request(
            Method::GET,
            "/api/v1/customers",
            None,
            Some(&token("some-other-secret")),
        )
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let app = offline_app(Some(TEST_JWT_SECRET));

    let response = app
        .request(
            Method::GET,
            "/api/v1/customers?limit=0",
            None,
            Some(&token(TEST_JWT_SECRET)),
        )
        .await;

    // Past the guard, the handler's own validation answers.
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_health_endpoints_stay_unguarded() {
    let app = offline_app(Some(TEST_JWT_SECRET));

    let response = app.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_notes_body_is_rejected() {
    let app = offline_app(None);
    let uri = format!("/api/v1/work-orders/{}/complete", Uuid::new_v4());

    let response = app.post(&uri, json!({"notes": 5})).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}
