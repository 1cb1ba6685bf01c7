use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::customers::{
    CreateCustomerRequest, CustomerListParams, CustomerResponse, CUSTOMER_SORT,
};
use crate::dtos::{ApiResponse, ListQuery, ListResponse};
use crate::AppState;

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerResponse>>), AppError> {
    payload.validate()?;

    let customer = state.db.create_customer(&payload.into()).await?;

    tracing::info!(
        customer_id = %customer.customer_id,
        account_number = %customer.account_number,
        "Customer created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            CustomerResponse::from(customer),
            "Customer created",
        )),
    ))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomerResponse>>, AppError> {
    let customer = state.db.get_customer(customer_id).await?;
    Ok(Json(ApiResponse::ok(
        CustomerResponse::from(customer),
        "Customer retrieved",
    )))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Query(params): Query<CustomerListParams>,
) -> Result<Json<ListResponse<CustomerResponse>>, AppError> {
    let page = query.page_request(CUSTOMER_SORT)?;
    let (rows, total) = state.db.list_customers(&params.into(), &page).await?;
    Ok(Json(ListResponse::new(rows, total, &page)))
}
