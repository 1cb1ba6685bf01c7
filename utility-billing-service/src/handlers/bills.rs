use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::bills::{
    BillListParams, BillResponse, BillSummaryParams, BillSummaryResponse, CreateBillRequest,
    MarkOverdueParams, MarkOverdueResponse, OverdueParams, BILL_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::models::{BillStatus, ListBillsFilter};
use crate::services::{record_error, record_transition};
use crate::AppState;

/// Issue a bill. Totals and tax lines are computed server-side.
pub async fn create_bill(
    State(state): State<AppState>,
    Json(payload): Json<CreateBillRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BillResponse>>), AppError> {
    payload.validate()?;

    let (bill, taxes) = state.db.create_bill(&payload.into()).await?;

    tracing::info!(
        bill_id = %bill.bill_id,
        customer_id = %bill.customer_id,
        total_amount = %bill.total_amount,
        status = %bill.bill_status,
        "Bill created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            BillResponse::with_taxes(bill, taxes),
            "Bill created",
        )),
    ))
}

pub async fn get_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Result<Json<ApiResponse<BillResponse>>, AppError> {
    let bill = state.db.get_bill(bill_id).await?;
    let taxes = state.db.get_bill_taxes(bill_id).await?;
    Ok(Json(ApiResponse::ok(
        BillResponse::with_taxes(bill, taxes),
        "Bill retrieved",
    )))
}

pub async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<BillListParams>,
) -> Result<Json<ListResponse<BillResponse>>, AppError> {
    let page = query.page_request(BILL_SORT)?;
    let (rows, total) = state.db.list_bills(&params.into(), &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

/// Collectable bills whose due date has passed, whether or not the sweep has
/// flagged them yet.
pub async fn list_overdue_bills(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<OverdueParams>,
) -> Result<Json<ListResponse<BillResponse>>, AppError> {
    let page = query.page_request(BILL_SORT)?;
    let filter = ListBillsFilter {
        customer_id: params.customer_id,
        overdue_as_of: Some(params.as_of.unwrap_or_else(|| Utc::now().date_naive())),
        ..Default::default()
    };
    let (rows, total) = state.db.list_bills(&filter, &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

pub async fn bill_summary(
    State(state): State<AppState>,
    Query(params): Query<BillSummaryParams>,
) -> Result<Json<ApiResponse<BillSummaryResponse>>, AppError> {
    let rows = state.db.bill_summary(params.customer_id).await?;
    Ok(Json(ApiResponse::ok(
        BillSummaryResponse::from(rows),
        "Bill summary retrieved",
    )))
}

pub async fn mark_overdue(
    State(state): State<AppState>,
    Query(params): Query<MarkOverdueParams>,
) -> Result<Json<ApiResponse<MarkOverdueResponse>>, AppError> {
    let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let updated_count = state.db.mark_overdue(as_of).await?;

    if updated_count > 0 {
        record_transition("bill", BillStatus::Overdue.as_str());
    }

    Ok(Json(ApiResponse::ok(
        MarkOverdueResponse {
            as_of,
            updated_count,
        },
        format!("{} bills marked overdue", updated_count),
    )))
}

pub async fn void_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Result<Json<ApiResponse<BillResponse>>, AppError> {
    let bill = state
        .db
        .void_bill(bill_id)
        .await
        .inspect_err(|e| record_error(e.kind()))?;

    record_transition("bill", BillStatus::Voided.as_str());

    Ok(Json(ApiResponse::ok(BillResponse::from(bill), "Bill voided")))
}
