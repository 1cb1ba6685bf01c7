use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use service_core::error::AppError;
use service_core::middleware::auth::AuthUser;
use validator::Validate;

use crate::dtos::payments::{
    DailyCollectionsParams, DailyCollectionsResponse, PaymentListParams, PaymentReceiptResponse,
    PaymentResponse, ReconciliationRequest, RecordPaymentRequest, PAYMENT_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::models::{BillStatus, RecordPayment};
use crate::services::reconciliation::{reconcile, summarize_collections, ReconciliationReport};
use crate::services::{record_error, record_payment, record_payment_amount, record_transition};
use crate::AppState;

/// Cashier desk: spread one payment over the selected bills, in order.
///
/// With auth enabled the token subject is recorded as the cashier and any
/// `recordedBy` in the body is ignored.
pub async fn record_cashier_payment(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentReceiptResponse>>), AppError> {
    payload.validate()?;

    let mut input = RecordPayment::from(payload);
    if let Some(AuthUser(claims)) = caller {
        input.recorded_by = Some(claims.sub);
    }
    let method = input.payment_method.as_str();

    let recorded = match state
        .db
        .record_payment(&input, &state.config.receipt_prefix)
        .await
    {
        Ok(recorded) => recorded,
        Err(e) => {
            record_payment(method, "failed");
            record_error(e.kind());
            return Err(e);
        }
    };

    record_payment(method, "success");
    record_payment_amount(
        method,
        recorded.plan.total_allocated.to_f64().unwrap_or_default(),
    );
    for allocation in recorded.plan.applied() {
        let status = if allocation.is_fully_paid {
            BillStatus::Paid
        } else {
            BillStatus::Partial
        };
        record_transition("bill", status.as_str());
    }

    tracing::info!(
        receipt_number = %recorded.receipt_number,
        customer_id = %input.customer_id,
        payment_method = method,
        total_allocated = %recorded.plan.total_allocated,
        excess_amount = %recorded.plan.excess_amount,
        "Cashier payment recorded"
    );

    let message = if recorded.plan.excess_amount.is_zero() {
        "Payment recorded".to_string()
    } else {
        format!(
            "Payment recorded; {} exceeds the selected bills and was not applied",
            recorded.plan.excess_amount
        )
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            PaymentReceiptResponse::from(recorded),
            message,
        )),
    ))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<ListResponse<PaymentResponse>>, AppError> {
    let page = query.page_request(PAYMENT_SORT)?;
    let (rows, total) = state.db.list_payments(&params.into(), &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

/// Per-method totals for one day, defaulting to today.
pub async fn daily_collections(
    State(state): State<AppState>,
    Query(params): Query<DailyCollectionsParams>,
) -> Result<Json<ApiResponse<DailyCollectionsResponse>>, AppError> {
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let payments = state.db.collected_payments(date, date).await?;

    Ok(Json(ApiResponse::ok(
        DailyCollectionsResponse {
            date,
            summary: summarize_collections(&payments),
        },
        format!("Collections for {}", date),
    )))
}

pub async fn reconcile_collections(
    State(state): State<AppState>,
    Json(payload): Json<ReconciliationRequest>,
) -> Result<Json<ApiResponse<ReconciliationReport>>, AppError> {
    payload.validate()?;
    let policy = payload.policy(state.policy)?;

    let payments = state
        .db
        .collected_payments(payload.start_date, payload.end_date)
        .await?;
    let report = reconcile(&payments, &payload.expected, &policy);

    tracing::info!(
        start_date = %payload.start_date,
        end_date = %payload.end_date,
        payment_count = report.payment_count,
        total_variance = %report.total_variance,
        status = report.status.as_str(),
        "Collections reconciled"
    );

    let message = format!("Reconciliation {}", report.status.as_str());
    Ok(Json(ApiResponse::ok(report, message)))
}
