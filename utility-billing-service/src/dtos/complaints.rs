use crate::models::{Complaint, ComplaintStatus, CreateComplaint, ListComplaintsFilter};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::SortColumns;

pub const COMPLAINT_SORT: SortColumns = &[
    ("createdUtc", "created_utc"),
    ("status", "status"),
    ("resolvedDate", "resolved_date"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaintRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 64, message = "Complaint type is required"))]
    pub complaint_type: String,
    #[validate(length(min = 1, max = 4000, message = "Description is required"))]
    pub description: String,
}

impl From<CreateComplaintRequest> for CreateComplaint {
    fn from(req: CreateComplaintRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            complaint_type: req.complaint_type,
            description: req.description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintListParams {
    pub status: Option<ComplaintStatus>,
    pub customer_id: Option<Uuid>,
    pub assigned_employee_id: Option<Uuid>,
    pub complaint_type: Option<String>,
}

impl From<ComplaintListParams> for ListComplaintsFilter {
    fn from(params: ComplaintListParams) -> Self {
        Self {
            status: params.status,
            customer_id: params.customer_id,
            assigned_employee_id: params.assigned_employee_id,
            complaint_type: params.complaint_type,
        }
    }
}

/// Body of `PATCH /complaints/:id/assign`. A missing employee is rejected
/// by the transition guard.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub employee_id: Option<Uuid>,
}

/// Optional resolution notes for resolve/close style transitions.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotesRequest {
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub complaint_id: Uuid,
    pub customer_id: Uuid,
    pub complaint_type: String,
    pub description: String,
    pub status: String,
    pub assigned_employee_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolved_date: Option<DateTime<Utc>>,
    pub resolution_time_hours: Option<Decimal>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Complaint> for ComplaintResponse {
    fn from(c: Complaint) -> Self {
        Self {
            complaint_id: c.complaint_id,
            customer_id: c.customer_id,
            complaint_type: c.complaint_type,
            description: c.description,
            status: c.status,
            assigned_employee_id: c.assigned_employee_id,
            resolution_notes: c.resolution_notes,
            resolved_date: c.resolved_date,
            resolution_time_hours: c.resolution_time_hours,
            created_utc: c.created_utc,
            updated_utc: c.updated_utc,
        }
    }
}
