use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::complaints::NotesRequest;
use crate::dtos::work_orders::{
    AddItemUsageRequest, AddLaborRequest, CreateWorkOrderRequest, ItemUsageResponse,
    LaborResponse, UpdateStatusRequest, WorkOrderListParams, WorkOrderResponse, WORK_ORDER_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::models::WorkOrderStatus;
use crate::services::costing::{work_order_statistics, WorkOrderStatistics};
use crate::services::{record_error, record_transition};
use super::extract::OptionalJson;
use crate::AppState;

pub async fn create_work_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkOrderResponse>>), AppError> {
    payload.validate()?;

    let work_order = state.db.create_work_order(&payload.into()).await?;

    tracing::info!(
        work_order_id = %work_order.work_order_id,
        priority = %work_order.priority,
        "Work order created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            WorkOrderResponse::from(work_order),
            "Work order created",
        )),
    ))
}

/// Work order with its labor and item lines and the rolled-up cost.
pub async fn get_work_order(
    State(state): State<AppState>,
    Path(work_order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<WorkOrderResponse>>, AppError> {
    let work_order = state.db.get_work_order(work_order_id).await?;
    let (labor, items) = state.db.get_work_order_lines(work_order_id).await?;
    Ok(Json(ApiResponse::ok(
        WorkOrderResponse::with_lines(work_order, labor, items),
        "Work order retrieved",
    )))
}

pub async fn list_work_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<WorkOrderListParams>,
) -> Result<Json<ListResponse<WorkOrderResponse>>, AppError> {
    let page = query.page_request(WORK_ORDER_SORT)?;
    let (rows, total) = state.db.list_work_orders(&params.into(), &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

pub async fn work_order_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<WorkOrderStatistics>>, AppError> {
    let rows = state.db.work_order_cost_rows().await?;
    Ok(Json(ApiResponse::ok(
        work_order_statistics(&rows),
        "Work order statistics retrieved",
    )))
}

async fn transition(
    state: &AppState,
    work_order_id: Uuid,
    target: WorkOrderStatus,
    employee_id: Option<Uuid>,
    notes: Option<String>,
) -> Result<Json<ApiResponse<WorkOrderResponse>>, AppError> {
    let work_order = state
        .db
        .transition_work_order(work_order_id, target, employee_id, notes)
        .await
        .inspect_err(|e| record_error(e.kind()))?;

    record_transition("work_order", target.as_str());

    Ok(Json(ApiResponse::ok(
        WorkOrderResponse::from(work_order),
        format!("Work order is now {}", target.as_str()),
    )))
}

/// Any transition allowed by the work order lifecycle.
pub async fn update_work_order_status(
    State(state): State<AppState>,
    Path(work_order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<WorkOrderResponse>>, AppError> {
    payload.validate()?;
    transition(
        &state,
        work_order_id,
        payload.status,
        payload.employee_id,
        payload.notes,
    )
    .await
}

pub async fn complete_work_order(
    State(state): State<AppState>,
    Path(work_order_id): Path<Uuid>,
    OptionalJson(payload): OptionalJson<NotesRequest>,
) -> Result<Json<ApiResponse<WorkOrderResponse>>, AppError> {
    payload.validate()?;
    transition(
        &state,
        work_order_id,
        WorkOrderStatus::Completed,
        None,
        payload.notes,
    )
    .await
}

pub async fn cancel_work_order(
    State(state): State<AppState>,
    Path(work_order_id): Path<Uuid>,
    OptionalJson(payload): OptionalJson<NotesRequest>,
) -> Result<Json<ApiResponse<WorkOrderResponse>>, AppError> {
    payload.validate()?;
    transition(
        &state,
        work_order_id,
        WorkOrderStatus::Cancelled,
        None,
        payload.notes,
    )
    .await
}

pub async fn add_labor(
    State(state): State<AppState>,
    Path(work_order_id): Path<Uuid>,
    Json(payload): Json<AddLaborRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LaborResponse>>), AppError> {
    payload.validate()?;

    let labor = state
        .db
        .add_labor(
            work_order_id,
            payload.employee_id,
            payload.hours,
            payload.hourly_rate,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(LaborResponse::from(labor), "Labor added")),
    ))
}

pub async fn add_item_usage(
    State(state): State<AppState>,
    Path(work_order_id): Path<Uuid>,
    Json(payload): Json<AddItemUsageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ItemUsageResponse>>), AppError> {
    payload.validate()?;

    let item = state
        .db
        .add_item_usage(
            work_order_id,
            &payload.item_name,
            payload.quantity,
            payload.item_cost_amount,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ItemUsageResponse::from(item),
            "Item usage added",
        )),
    ))
}
