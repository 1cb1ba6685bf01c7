use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::complaints::{
    AssignRequest, ComplaintListParams, ComplaintResponse, CreateComplaintRequest, NotesRequest,
    COMPLAINT_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::models::ComplaintAction;
use crate::services::{record_error, record_transition};
use super::extract::OptionalJson;
use crate::AppState;

pub async fn create_complaint(
    State(state): State<AppState>,
    Json(payload): Json<CreateComplaintRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ComplaintResponse>>), AppError> {
    payload.validate()?;

    let complaint = state.db.create_complaint(&payload.into()).await?;

    tracing::info!(
        complaint_id = %complaint.complaint_id,
        customer_id = %complaint.customer_id,
        complaint_type = %complaint.complaint_type,
        "Complaint logged"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ComplaintResponse::from(complaint),
            "Complaint created",
        )),
    ))
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ComplaintResponse>>, AppError> {
    let complaint = state.db.get_complaint(complaint_id).await?;
    Ok(Json(ApiResponse::ok(
        ComplaintResponse::from(complaint),
        "Complaint retrieved",
    )))
}

pub async fn list_complaints(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<ComplaintListParams>,
) -> Result<Json<ListResponse<ComplaintResponse>>, AppError> {
    let page = query.page_request(COMPLAINT_SORT)?;
    let (rows, total) = state.db.list_complaints(&params.into(), &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

async fn transition(
    state: &AppState,
    complaint_id: Uuid,
    action: ComplaintAction,
) -> Result<Json<ApiResponse<ComplaintResponse>>, AppError> {
    let complaint = state
        .db
        .transition_complaint(complaint_id, action)
        .await
        .inspect_err(|e| record_error(e.kind()))?;

    record_transition("complaint", &complaint.status);
    tracing::info!(
        complaint_id = %complaint_id,
        status = %complaint.status,
        "Complaint status changed"
    );

    let message = format!("Complaint is now {}", complaint.status);
    Ok(Json(ApiResponse::ok(
        ComplaintResponse::from(complaint),
        message,
    )))
}

pub async fn assign_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<ApiResponse<ComplaintResponse>>, AppError> {
    let action = ComplaintAction::Assign {
        employee_id: payload.employee_id,
    };
    transition(&state, complaint_id, action).await
}

pub async fn start_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ComplaintResponse>>, AppError> {
    transition(&state, complaint_id, ComplaintAction::Start).await
}

pub async fn resolve_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    OptionalJson(payload): OptionalJson<NotesRequest>,
) -> Result<Json<ApiResponse<ComplaintResponse>>, AppError> {
    payload.validate()?;
    let action = ComplaintAction::Resolve {
        notes: payload.notes,
    };
    transition(&state, complaint_id, action).await
}

pub async fn close_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    OptionalJson(payload): OptionalJson<NotesRequest>,
) -> Result<Json<ApiResponse<ComplaintResponse>>, AppError> {
    payload.validate()?;
    let action = ComplaintAction::Close {
        notes: payload.notes,
    };
    transition(&state, complaint_id, action).await
}
