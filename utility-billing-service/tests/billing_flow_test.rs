//! Billing and cashier flows against a real database.
//!
//! Requires `TEST_DATABASE_URL`; each test is skipped when it is unset.

mod common;

use axum::http::StatusCode;
use axum::http::Method;
use common::{database_app, database_app_with_auth, decimal, TestApp, TEST_JWT_SECRET};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use serial_test::serial;
use service_core::middleware::auth::{issue_token, AuthClaims};
use uuid::Uuid;

struct Account {
    customer_id: String,
    meter_id: String,
}

async fn create_account(app: &TestApp) -> Account {
    let suffix = &Uuid::new_v4().simple().to_string()[..10];

    let customer = app
        .post(
            "/api/v1/customers",
            json!({
                "accountNumber": format!("ACC-{}", suffix),
                "fullName": "Amara Okafor",
                "email": "amara@example.com",
                "customerType": "RESIDENTIAL"
            }),
        )
        .await;
    assert_eq!(customer.status, StatusCode::CREATED, "{}", customer.body);
    let customer_id = customer.body["data"]["customerId"]
        .as_str()
        .unwrap()
        .to_string();

    let connection = app
        .post(
            "/api/v1/connections",
            json!({
                "customerId": customer_id,
                "utilityType": "ELECTRICITY",
                "tariffCode": "R1",
                "serviceAddress": "12 Harbour Road"
            }),
        )
        .await;
    assert_eq!(connection.status, StatusCode::CREATED, "{}", connection.body);
    let connection_id = connection.body["data"]["connectionId"].as_str().unwrap();

    let meter = app
        .post(
            "/api/v1/meters",
            json!({
                "connectionId": connection_id,
                "serialNumber": format!("MTR-{}", suffix),
                "meterType": "SMART",
                "installedOn": "2024-01-01"
            }),
        )
        .await;
    assert_eq!(meter.status, StatusCode::CREATED, "{}", meter.body);

    Account {
        customer_id,
        meter_id: meter.body["data"]["meterId"].as_str().unwrap().to_string(),
    }
}

async fn create_bill(app: &TestApp, account: &Account, energy: &str, due: &str) -> Value {
    let response = app
        .post(
            "/api/v1/bills",
            json!({
                "customerId": account.customer_id,
                "meterId": account.meter_id,
                "billingPeriodStart": "2024-01-01",
                "billingPeriodEnd": "2024-01-31",
                "energyChargeAmount": energy,
                "dueDate": due
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["data"].clone()
}

#[tokio::test]
#[serial]
async fn test_bill_total_is_computed_server_side() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;

    let response = app
        .post(
            "/api/v1/bills",
            json!({
                "customerId": account.customer_id,
                "meterId": account.meter_id,
                "billingPeriodStart": "2024-01-01",
                "billingPeriodEnd": "2024-01-31",
                "energyChargeAmount": "1000",
                "fixedChargeAmount": "500",
                "subsidyAmount": "100",
                "solarExportCredit": "50",
                "taxes": [{"taxName": "VAT", "ratePercentApplied": "10", "taxableBaseAmount": "1350"}],
                "dueDate": "2024-02-15"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let bill = &response.body["data"];
    assert_eq!(decimal(&bill["taxAmount"]), dec!(135));
    assert_eq!(decimal(&bill["totalAmount"]), dec!(1485));
    assert_eq!(decimal(&bill["outstandingAmount"]), dec!(1485));
    assert_eq!(bill["billStatus"], "PENDING");
    assert_eq!(bill["taxes"][0]["taxName"], "VAT");

    let fetched = app
        .get(&format!("/api/v1/bills/{}", bill["billId"].as_str().unwrap()))
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(decimal(&fetched.body["data"]["taxes"][0]["taxAmount"]), dec!(135));
}

#[tokio::test]
#[serial]
async fn test_bill_for_someone_elses_meter_is_rejected() {
    let Some(app) = database_app().await else {
        return;
    };
    let owner = create_account(&app).await;
    let other = create_account(&app).await;

    let response = app
        .post(
            "/api/v1/bills",
            json!({
                "customerId": other.customer_id,
                "meterId": owner.meter_id,
                "billingPeriodStart": "2024-01-01",
                "billingPeriodEnd": "2024-01-31",
                "energyChargeAmount": "10",
                "dueDate": "2024-02-15"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_payment_is_allocated_in_selection_order() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let first = create_bill(&app, &account, "1000", "2024-02-15").await;
    let second = create_bill(&app, &account, "2000", "2024-03-15").await;

    let response = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": account.customer_id,
                "billIds": [first["billId"], second["billId"]],
                "paymentAmount": "2500",
                "paymentMethod": "BANK_TRANSFER",
                "transactionRef": "BT-7781",
                "paymentDate": "2024-03-01"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let receipt = &response.body["data"];
    assert!(receipt["receiptNumber"]
        .as_str()
        .unwrap()
        .starts_with("TST-20240301-"));
    assert_eq!(decimal(&receipt["totalAllocated"]), dec!(2500));
    assert_eq!(decimal(&receipt["excessAmount"]), dec!(0));
    assert_eq!(decimal(&receipt["allocations"][0]["allocatedAmount"]), dec!(1000));
    assert_eq!(receipt["allocations"][0]["isFullyPaid"], true);
    assert_eq!(decimal(&receipt["allocations"][1]["allocatedAmount"]), dec!(1500));
    assert_eq!(decimal(&receipt["allocations"][1]["outstandingAfter"]), dec!(500));
    assert_eq!(receipt["payments"].as_array().unwrap().len(), 2);

    let first_after = app
        .get(&format!("/api/v1/bills/{}", first["billId"].as_str().unwrap()))
        .await;
    assert_eq!(first_after.body["data"]["billStatus"], "PAID");

    let second_after = app
        .get(&format!("/api/v1/bills/{}", second["billId"].as_str().unwrap()))
        .await;
    assert_eq!(second_after.body["data"]["billStatus"], "PARTIAL");
    assert_eq!(decimal(&second_after.body["data"]["amountPaid"]), dec!(1500));
}

#[tokio::test]
#[serial]
async fn test_overpayment_reports_excess_without_applying_it() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let bill = create_bill(&app, &account, "2500", "2024-02-15").await;

    let response = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": account.customer_id,
                "billIds": [bill["billId"]],
                "paymentAmount": "5000",
                "paymentMethod": "CASH"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(decimal(&response.body["data"]["totalAllocated"]), dec!(2500));
    assert_eq!(decimal(&response.body["data"]["excessAmount"]), dec!(2500));

    let payments = app
        .get(&format!(
            "/api/v1/payments?customerId={}",
            account.customer_id
        ))
        .await;
    assert_eq!(payments.body["meta"]["total"], 1);
    assert_eq!(decimal(&payments.body["data"][0]["paymentAmount"]), dec!(2500));
}

#[tokio::test]
#[serial]
async fn test_voided_bill_rejects_payment() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let bill = create_bill(&app, &account, "300", "2024-02-15").await;
    let bill_id = bill["billId"].as_str().unwrap();

    let voided = app
        .patch(&format!("/api/v1/bills/{}/void", bill_id), None)
        .await;
    assert_eq!(voided.status, StatusCode::OK, "{}", voided.body);
    assert_eq!(voided.body["data"]["billStatus"], "VOIDED");

    let again = app
        .patch(&format!("/api/v1/bills/{}/void", bill_id), None)
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let payment = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": account.customer_id,
                "billIds": [bill_id],
                "paymentAmount": "300",
                "paymentMethod": "CASH"
            }),
        )
        .await;
    assert_eq!(payment.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_unknown_bill_in_selection_is_not_found() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let bill = create_bill(&app, &account, "100", "2024-02-15").await;

    let response = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": account.customer_id,
                "billIds": [bill["billId"], Uuid::new_v4()],
                "paymentAmount": "100",
                "paymentMethod": "CASH"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Nothing was applied to the first bill.
    let unchanged = app
        .get(&format!("/api/v1/bills/{}", bill["billId"].as_str().unwrap()))
        .await;
    assert_eq!(unchanged.body["data"]["billStatus"], "PENDING");
}

#[tokio::test]
#[serial]
async fn test_overdue_sweep_and_summary() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    create_bill(&app, &account, "400", "2024-01-15").await;
    create_bill(&app, &account, "600", "2099-01-15").await;

    let overdue = app
        .get(&format!(
            "/api/v1/bills/overdue?customerId={}",
            account.customer_id
        ))
        .await;
    assert_eq!(overdue.status, StatusCode::OK);
    assert_eq!(overdue.body["meta"]["total"], 1);

    let sweep = app
        .post("/api/v1/bills/mark-overdue", json!({}))
        .await;
    assert_eq!(sweep.status, StatusCode::OK);
    assert!(sweep.body["data"]["updatedCount"].as_u64().unwrap() >= 1);

    let summary = app
        .get(&format!(
            "/api/v1/bills/summary?customerId={}",
            account.customer_id
        ))
        .await;
    assert_eq!(summary.status, StatusCode::OK);
    let data = &summary.body["data"];
    assert_eq!(data["billCount"], 2);
    assert_eq!(decimal(&data["totalBilled"]), dec!(1000));
    assert_eq!(decimal(&data["totalOutstanding"]), dec!(1000));
    let statuses: Vec<&str> = data["byStatus"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["OVERDUE", "PENDING"]);
}

#[tokio::test]
#[serial]
async fn test_meter_readings_compute_consumption() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let uri = format!("/api/v1/meters/{}/readings", account.meter_id);

    let baseline = app
        .post(&uri, json!({"readingValue": "1200", "readingDate": "2024-01-01"}))
        .await;
    assert_eq!(baseline.status, StatusCode::CREATED, "{}", baseline.body);
    assert_eq!(decimal(&baseline.body["data"]["consumption"]), dec!(0));

    let next = app
        .post(&uri, json!({"readingValue": "1450.5", "readingDate": "2024-02-01"}))
        .await;
    assert_eq!(next.status, StatusCode::CREATED, "{}", next.body);
    assert_eq!(decimal(&next.body["data"]["consumption"]), dec!(250.5));

    let rollback = app
        .post(&uri, json!({"readingValue": "1000", "readingDate": "2024-03-01"}))
        .await;
    assert_eq!(rollback.status, StatusCode::BAD_REQUEST);

    let backdated = app
        .post(&uri, json!({"readingValue": "1500", "readingDate": "2024-01-15"}))
        .await;
    assert_eq!(backdated.status, StatusCode::BAD_REQUEST);

    let listed = app.get(&format!("{}?order=ASC", uri)).await;
    assert_eq!(listed.body["meta"]["total"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_concurrent_payments_never_overpay_a_bill() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let bill = create_bill(&app, &account, "1000", "2024-02-15").await;
    let bill_id = bill["billId"].as_str().unwrap().to_string();

    let payment = json!({
        "customerId": account.customer_id,
        "billIds": [bill_id],
        "paymentAmount": "600",
        "paymentMethod": "CASH"
    });
    let (first, second) = tokio::join!(
        app.post("/api/v1/payments/cashier/record-payment", payment.clone()),
        app.post("/api/v1/payments/cashier/record-payment", payment.clone()),
    );
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    assert_eq!(second.status, StatusCode::CREATED, "{}", second.body);

    let mut excess = [
        decimal(&first.body["data"]["excessAmount"]),
        decimal(&second.body["data"]["excessAmount"]),
    ];
    excess.sort();
    assert_eq!(excess, [dec!(0), dec!(200)]);

    let after = app.get(&format!("/api/v1/bills/{}", bill_id)).await;
    assert_eq!(after.body["data"]["billStatus"], "PAID");
    assert_eq!(decimal(&after.body["data"]["amountPaid"]), dec!(1000));
    assert_eq!(decimal(&after.body["data"]["outstandingAmount"]), dec!(0));
}

#[tokio::test]
#[serial]
async fn test_paying_another_customers_bill_is_not_found() {
    let Some(app) = database_app().await else {
        return;
    };
    let payer = create_account(&app).await;
    let owner = create_account(&app).await;
    let bill = create_bill(&app, &owner, "400", "2024-02-15").await;
    let bill_id = bill["billId"].as_str().unwrap();

    let response = app
        .post(
            "/api/v1/payments/cashier/record-payment",
            json!({
                "customerId": payer.customer_id,
                "billIds": [bill_id],
                "paymentAmount": "400",
                "paymentMethod": "CASH"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let unchanged = app.get(&format!("/api/v1/bills/{}", bill_id)).await;
    assert_eq!(unchanged.body["data"]["billStatus"], "PENDING");
    assert_eq!(decimal(&unchanged.body["data"]["amountPaid"]), dec!(0));

    let payments = app
        .get(&format!("/api/v1/payments?billId={}", bill_id))
        .await;
    assert_eq!(payments.body["meta"]["total"], 0);
}

#[tokio::test]
#[serial]
async fn test_fractional_cent_payment_leaves_bill_untouched() {
    let Some(app) = database_app().await else {
        return;
    };
    let account = create_account(&app).await;
    let bill = create_bill(&app, &account, "1000", "2024-02-15").await;
    let bill_id = bill["billId"].as_str().unwrap();

    for amount in ["999.995", "0.004"] {
        let response = app
            .post(
                "/api/v1/payments/cashier/record-payment",
                json!({
                    "customerId": account.customer_id,
                    "billIds": [bill_id],
                    "paymentAmount": amount,
                    "paymentMethod": "CASH"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{}", amount);
    }

    let unchanged = app.get(&format!("/api/v1/bills/{}", bill_id)).await;
    assert_eq!(unchanged.body["data"]["billStatus"], "PENDING");
    assert_eq!(decimal(&unchanged.body["data"]["amountPaid"]), dec!(0));
}

#[tokio::test]
#[serial]
async fn test_cashier_is_taken_from_token_subject() {
    let Some(app) = database_app_with_auth(Some(TEST_JWT_SECRET)).await else {
        return;
    };
    let token = issue_token(
        TEST_JWT_SECRET.as_bytes(),
        &AuthClaims {
            sub: "cashier-017".to_string(),
            role: Some("CASHIER".to_string()),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        },
    )
    .unwrap();

    // Setup runs on an unguarded router over the same database.
    let Some(open) = database_app().await else {
        return;
    };
    let account = create_account(&open).await;
    let bill = create_bill(&open, &account, "250", "2024-02-15").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/cashier/record-payment",
            Some(json!({
                "customerId": account.customer_id,
                "billIds": [bill["billId"]],
                "paymentAmount": "250",
                "paymentMethod": "CASH",
                "recordedBy": "someone-else"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(
        response.body["data"]["payments"][0]["recordedBy"],
        "cashier-017"
    );
}
