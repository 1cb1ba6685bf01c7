use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::connections::{
    ConnectionListParams, ConnectionResponse, CreateConnectionRequest, CONNECTION_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::models::ConnectionAction;
use crate::services::{record_error, record_transition};
use crate::AppState;

pub async fn create_connection(
    State(state): State<AppState>,
    Json(payload): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConnectionResponse>>), AppError> {
    payload.validate()?;

    let connection = state.db.create_connection(&payload.into()).await?;

    tracing::info!(
        connection_id = %connection.connection_id,
        customer_id = %connection.customer_id,
        utility_type = %connection.utility_type,
        "Service connection created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            ConnectionResponse::from(connection),
            "Connection created",
        )),
    ))
}

pub async fn get_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, AppError> {
    let connection = state.db.get_connection(connection_id).await?;
    Ok(Json(ApiResponse::ok(
        ConnectionResponse::from(connection),
        "Connection retrieved",
    )))
}

pub async fn list_connections(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<ConnectionListParams>,
) -> Result<Json<ListResponse<ConnectionResponse>>, AppError> {
    let page = query.page_request(CONNECTION_SORT)?;
    let (rows, total) = state.db.list_connections(&params.into(), &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}

async fn transition(
    state: &AppState,
    connection_id: Uuid,
    action: ConnectionAction,
) -> Result<Json<ApiResponse<ConnectionResponse>>, AppError> {
    let connection = state
        .db
        .transition_connection(connection_id, action)
        .await
        .inspect_err(|e| record_error(e.kind()))?;

    record_transition("connection", &connection.status);
    tracing::info!(
        connection_id = %connection_id,
        action = action.as_str(),
        status = %connection.status,
        "Connection status changed"
    );

    let message = format!("Connection is now {}", connection.status);
    Ok(Json(ApiResponse::ok(
        ConnectionResponse::from(connection),
        message,
    )))
}

pub async fn activate_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, AppError> {
    transition(&state, connection_id, ConnectionAction::Activate).await
}

pub async fn suspend_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, AppError> {
    transition(&state, connection_id, ConnectionAction::Suspend).await
}

pub async fn reconnect_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, AppError> {
    transition(&state, connection_id, ConnectionAction::Reconnect).await
}

pub async fn disconnect_connection(
    State(state): State<AppState>,
    Path(connection_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, AppError> {
    transition(&state, connection_id, ConnectionAction::Disconnect).await
}
