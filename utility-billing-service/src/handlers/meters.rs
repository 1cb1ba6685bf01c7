use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::meters::{
    CreateMeterRequest, CreateReadingRequest, MeterListParams, MeterResponse, ReadingResponse,
    METER_SORT, READING_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::AppState;

pub async fn create_meter(
    State(state): State<AppState>,
    Json(payload): Json<CreateMeterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MeterResponse>>), AppError> {
    payload.validate()?;

    let meter = state.db.create_meter(&payload.into()).await?;

    tracing::info!(
        meter_id = %meter.meter_id,
        connection_id = %meter.connection_id,
        serial_number = %meter.serial_number,
        "Meter installed"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(MeterResponse::from(meter), "Meter created")),
    ))
}

pub async fn get_meter(
    State(state): State<AppState>,
    Path(meter_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MeterResponse>>, AppError> {
    let meter = state.db.get_meter(meter_id).await?;
    Ok(Json(ApiResponse::ok(
        MeterResponse::from(meter),
        "Meter retrieved",
    )))
}

pub async fn list_meters(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<MeterListParams>,
) -> Result<Json<ListResponse<MeterResponse>>, AppError> {
    let page = query.page_request(METER_SORT)?;
    let (rows, total) = state.db.list_meters(params.connection_id, &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

pub async fn record_reading(
    State(state): State<AppState>,
    Path(meter_id): Path<Uuid>,
    Json(payload): Json<CreateReadingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReadingResponse>>), AppError> {
    payload.validate()?;

    let reading = state.db.record_reading(&payload.into_input(meter_id)).await?;

    tracing::info!(
        meter_id = %meter_id,
        reading_id = %reading.reading_id,
        consumption = %reading.consumption,
        "Meter reading recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ReadingResponse::from(reading),
            "Reading recorded",
        )),
    ))
}

pub async fn list_readings(
    State(state): State<AppState>,
    Path(meter_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<ReadingResponse>>, AppError> {
    let page = query.page_request(READING_SORT)?;
    let (rows, total) = state.db.list_readings(meter_id, &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}
