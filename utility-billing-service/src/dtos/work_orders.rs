use crate::models::{
    CreateWorkOrder, ListWorkOrdersFilter, WorkOrder, WorkOrderItemUsage, WorkOrderLabor,
    WorkOrderPriority, WorkOrderStatus,
};
use crate::services::costing::{duration_hours, work_order_total_cost};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{non_negative_amount, positive, positive_amount, validation_error, SortColumns};

pub const WORK_ORDER_SORT: SortColumns = &[
    ("createdUtc", "created_utc"),
    ("priority", "priority"),
    ("scheduledStart", "scheduled_start"),
    ("status", "status"),
];

fn validate_schedule(req: &CreateWorkOrderRequest) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (req.scheduled_start, req.scheduled_end) {
        if end < start {
            return Err(validation_error(
                "schedule",
                "scheduledEnd must not be before scheduledStart",
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedule"))]
pub struct CreateWorkOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Work order type is required"))]
    pub work_order_type: String,
    pub priority: WorkOrderPriority,
    pub connection_id: Option<Uuid>,
    pub complaint_id: Option<Uuid>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

impl From<CreateWorkOrderRequest> for CreateWorkOrder {
    fn from(req: CreateWorkOrderRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            work_order_type: req.work_order_type,
            priority: req.priority,
            connection_id: req.connection_id,
            complaint_id: req.complaint_id,
            scheduled_start: req.scheduled_start,
            scheduled_end: req.scheduled_end,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderListParams {
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,
    pub assigned_employee_id: Option<Uuid>,
    pub connection_id: Option<Uuid>,
}

impl From<WorkOrderListParams> for ListWorkOrdersFilter {
    fn from(params: WorkOrderListParams) -> Self {
        Self {
            status: params.status,
            priority: params.priority,
            assigned_employee_id: params.assigned_employee_id,
            connection_id: params.connection_id,
        }
    }
}

/// Generic guarded transition.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: WorkOrderStatus,
    pub employee_id: Option<Uuid>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddLaborRequest {
    pub employee_id: Uuid,
    #[validate(custom(function = "positive_amount"))]
    pub hours: Decimal,
    /// Rate at the time the work was done.
    #[validate(custom(function = "non_negative_amount"))]
    pub hourly_rate: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemUsageRequest {
    #[validate(length(min = 1, max = 200, message = "Item name is required"))]
    pub item_name: String,
    #[validate(custom(function = "positive"))]
    pub quantity: Decimal,
    #[validate(custom(function = "non_negative_amount"))]
    pub item_cost_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborResponse {
    pub labor_id: Uuid,
    pub employee_id: Uuid,
    pub hours: Decimal,
    pub hourly_rate_snapshot: Decimal,
    pub line_cost: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl From<WorkOrderLabor> for LaborResponse {
    fn from(l: WorkOrderLabor) -> Self {
        Self {
            line_cost: l.hours * l.hourly_rate_snapshot,
            labor_id: l.labor_id,
            employee_id: l.employee_id,
            hours: l.hours,
            hourly_rate_snapshot: l.hourly_rate_snapshot,
            created_utc: l.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUsageResponse {
    pub item_usage_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    /// Cost of the whole line, not per unit.
    pub item_cost_amount: Decimal,
    pub created_utc: DateTime<Utc>,
}

impl From<WorkOrderItemUsage> for ItemUsageResponse {
    fn from(i: WorkOrderItemUsage) -> Self {
        Self {
            item_usage_id: i.item_usage_id,
            item_name: i.item_name,
            quantity: i.quantity,
            item_cost_amount: i.item_cost_amount,
            created_utc: i.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderResponse {
    pub work_order_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub work_order_type: String,
    pub priority: String,
    pub connection_id: Option<Uuid>,
    pub complaint_id: Option<Uuid>,
    pub assigned_employee_id: Option<Uuid>,
    pub status: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub duration_hours: Option<Decimal>,
    pub resolution_notes: Option<String>,
    pub closed_ts: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labor: Option<Vec<LaborResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ItemUsageResponse>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<WorkOrder> for WorkOrderResponse {
    fn from(w: WorkOrder) -> Self {
        Self {
            duration_hours: duration_hours(w.scheduled_start, w.scheduled_end),
            work_order_id: w.work_order_id,
            title: w.title,
            description: w.description,
            work_order_type: w.work_order_type,
            priority: w.priority,
            connection_id: w.connection_id,
            complaint_id: w.complaint_id,
            assigned_employee_id: w.assigned_employee_id,
            status: w.status,
            scheduled_start: w.scheduled_start,
            scheduled_end: w.scheduled_end,
            resolution_notes: w.resolution_notes,
            closed_ts: w.closed_ts,
            total_cost: None,
            labor: None,
            items: None,
            created_utc: w.created_utc,
            updated_utc: w.updated_utc,
        }
    }
}

impl WorkOrderResponse {
    /// Detail view with cost lines and the rolled-up total.
    pub fn with_lines(
        work_order: WorkOrder,
        labor: Vec<WorkOrderLabor>,
        items: Vec<WorkOrderItemUsage>,
    ) -> Self {
        let mut response = Self::from(work_order);
        response.total_cost = Some(work_order_total_cost(&labor, &items));
        response.labor = Some(labor.into_iter().map(LaborResponse::from).collect());
        response.items = Some(items.into_iter().map(ItemUsageResponse::from).collect());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn work_order() -> WorkOrder {
        let now = Utc::now();
        WorkOrder {
            work_order_id: Uuid::new_v4(),
            title: "Replace transformer fuse".to_string(),
            description: None,
            work_order_type: "REPAIR".to_string(),
            priority: "HIGH".to_string(),
            connection_id: None,
            complaint_id: None,
            assigned_employee_id: None,
            status: "IN_PROGRESS".to_string(),
            scheduled_start: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
            scheduled_end: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()),
            resolution_notes: None,
            closed_ts: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn test_detail_rolls_up_cost() {
        let wo = work_order();
        let labor = vec![WorkOrderLabor {
            labor_id: Uuid::new_v4(),
            work_order_id: wo.work_order_id,
            employee_id: Uuid::new_v4(),
            hours: dec!(2.5),
            hourly_rate_snapshot: dec!(40),
            created_utc: Utc::now(),
        }];
        let items = vec![WorkOrderItemUsage {
            item_usage_id: Uuid::new_v4(),
            work_order_id: wo.work_order_id,
            item_name: "Fuse 63A".to_string(),
            quantity: dec!(2),
            item_cost_amount: dec!(12.50),
            created_utc: Utc::now(),
        }];

        let response = WorkOrderResponse::with_lines(wo, labor, items);
        assert_eq!(response.total_cost, Some(dec!(112.50)));
        assert_eq!(response.duration_hours, Some(dec!(4.5)));
        assert_eq!(response.items.as_ref().map(Vec::len), Some(1));
        assert_eq!(response.labor.unwrap()[0].line_cost, dec!(100.0));
    }

    #[test]
    fn test_rejects_inverted_schedule() {
        let req: CreateWorkOrderRequest = serde_json::from_value(serde_json::json!({
            "title": "Inspect meter",
            "workOrderType": "INSPECTION",
            "priority": "LOW",
            "scheduledStart": "2024-03-01T12:00:00Z",
            "scheduledEnd": "2024-03-01T08:00:00Z"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_labor_hours_must_be_positive() {
        let req: AddLaborRequest = serde_json::from_value(serde_json::json!({
            "employeeId": Uuid::new_v4(),
            "hours": "0",
            "hourlyRate": "35"
        }))
        .unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("hours"));
    }
}
