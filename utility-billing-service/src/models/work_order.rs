//! Work order model and its lifecycle.

use super::{ParseEnumError, TransitionError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Work order status. COMPLETED and CANCELLED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    Open,
    Assigned,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub const ALL: [WorkOrderStatus; 6] = [
        WorkOrderStatus::Open,
        WorkOrderStatus::Assigned,
        WorkOrderStatus::InProgress,
        WorkOrderStatus::OnHold,
        WorkOrderStatus::Completed,
        WorkOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Open => "OPEN",
            WorkOrderStatus::Assigned => "ASSIGNED",
            WorkOrderStatus::InProgress => "IN_PROGRESS",
            WorkOrderStatus::OnHold => "ON_HOLD",
            WorkOrderStatus::Completed => "COMPLETED",
            WorkOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
    }
}

impl FromStr for WorkOrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(WorkOrderStatus::Open),
            "ASSIGNED" => Ok(WorkOrderStatus::Assigned),
            "IN_PROGRESS" => Ok(WorkOrderStatus::InProgress),
            "ON_HOLD" => Ok(WorkOrderStatus::OnHold),
            "COMPLETED" => Ok(WorkOrderStatus::Completed),
            "CANCELLED" => Ok(WorkOrderStatus::Cancelled),
            other => Err(ParseEnumError::new("work order status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl WorkOrderPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderPriority::Low => "LOW",
            WorkOrderPriority::Medium => "MEDIUM",
            WorkOrderPriority::High => "HIGH",
            WorkOrderPriority::Critical => "CRITICAL",
        }
    }
}

impl FromStr for WorkOrderPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(WorkOrderPriority::Low),
            "MEDIUM" => Ok(WorkOrderPriority::Medium),
            "HIGH" => Ok(WorkOrderPriority::High),
            "CRITICAL" => Ok(WorkOrderPriority::Critical),
            other => Err(ParseEnumError::new("work order priority", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrder {
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
    pub resolution_notes: Option<String>,
    pub closed_ts: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrderLabor {
    pub labor_id: Uuid,
    pub work_order_id: Uuid,
    pub employee_id: Uuid,
    pub hours: Decimal,
    pub hourly_rate_snapshot: Decimal,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkOrderItemUsage {
    pub item_usage_id: Uuid,
    pub work_order_id: Uuid,
    pub item_name: String,
    pub quantity: Decimal,
    pub item_cost_amount: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Column values to persist after a work order transition.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderUpdate {
    pub status: WorkOrderStatus,
    pub assigned_employee_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub closed_ts: Option<DateTime<Utc>>,
}

impl WorkOrder {
    pub fn status(&self) -> Result<WorkOrderStatus, ParseEnumError> {
        self.status.parse()
    }

    /// Move to `target`, checked against the transition table.
    ///
    /// OPEN -> ASSIGNED -> IN_PROGRESS <-> ON_HOLD -> COMPLETED, with
    /// CANCELLED reachable from every non-terminal status.
    pub fn transition(
        &self,
        target: WorkOrderStatus,
        employee_id: Option<Uuid>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<WorkOrderUpdate, TransitionError> {
        use WorkOrderStatus as S;

        let from = self.status().map_err(|_| TransitionError::Invalid {
            entity: "work order",
            from: "UNKNOWN",
            action: target.as_str(),
        })?;

        let allowed = matches!(
            (from, target),
            (S::Open | S::Assigned, S::Assigned)
                | (S::Assigned | S::OnHold, S::InProgress)
                | (S::InProgress, S::OnHold)
                | (S::InProgress, S::Completed)
                | (S::Open | S::Assigned | S::InProgress | S::OnHold, S::Cancelled)
        );
        if !allowed {
            return Err(TransitionError::Invalid {
                entity: "work order",
                from: from.as_str(),
                action: target.as_str(),
            });
        }

        let mut update = WorkOrderUpdate {
            status: target,
            assigned_employee_id: self.assigned_employee_id,
            resolution_notes: self.resolution_notes.clone(),
            closed_ts: self.closed_ts,
        };

        if target == S::Assigned {
            let employee_id = employee_id.ok_or(TransitionError::MissingAssignee {
                entity: "work order",
            })?;
            update.assigned_employee_id = Some(employee_id);
        }

        if target.is_terminal() {
            update.closed_ts = Some(now);
            if notes.is_some() {
                update.resolution_notes = notes;
            }
        }

        Ok(update)
    }
}

#[derive(Debug, Clone)]
pub struct CreateWorkOrder {
    pub title: String,
    pub description: Option<String>,
    pub work_order_type: String,
    pub priority: WorkOrderPriority,
    pub connection_id: Option<Uuid>,
    pub complaint_id: Option<Uuid>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

/// Filter parameters for listing work orders.
#[derive(Debug, Clone, Default)]
pub struct ListWorkOrdersFilter {
    pub status: Option<WorkOrderStatus>,
    pub priority: Option<WorkOrderPriority>,
    pub assigned_employee_id: Option<Uuid>,
    pub connection_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_order(status: WorkOrderStatus) -> WorkOrder {
        let now = Utc::now();
        WorkOrder {
            work_order_id: Uuid::new_v4(),
            title: "Replace meter seal".to_string(),
            description: None,
            work_order_type: "METER_MAINTENANCE".to_string(),
            priority: "MEDIUM".to_string(),
            connection_id: None,
            complaint_id: None,
            assigned_employee_id: None,
            status: status.as_str().to_string(),
            scheduled_start: None,
            scheduled_end: None,
            resolution_notes: None,
            closed_ts: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn test_full_lifecycle_with_hold() {
        let now = Utc::now();
        let technician = Uuid::new_v4();
        let mut order = work_order(WorkOrderStatus::Open);

        for target in [
            WorkOrderStatus::Assigned,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::OnHold,
            WorkOrderStatus::InProgress,
        ] {
            let update = order
                .transition(target, Some(technician), None, now)
                .unwrap();
            assert_eq!(update.closed_ts, None);
            order.status = update.status.as_str().to_string();
            order.assigned_employee_id = update.assigned_employee_id;
        }

        let done = order
            .transition(
                WorkOrderStatus::Completed,
                None,
                Some("Seal replaced".to_string()),
                now,
            )
            .unwrap();
        assert_eq!(done.status, WorkOrderStatus::Completed);
        assert_eq!(done.closed_ts, Some(now));
        assert_eq!(done.resolution_notes.as_deref(), Some("Seal replaced"));
        assert_eq!(done.assigned_employee_id, Some(technician));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let now = Utc::now();
        for terminal in [WorkOrderStatus::Completed, WorkOrderStatus::Cancelled] {
            for target in WorkOrderStatus::ALL {
                assert!(work_order(terminal)
                    .transition(target, Some(Uuid::new_v4()), None, now)
                    .is_err());
            }
        }
    }

    #[test]
    fn test_cancel_from_any_open_state_stamps_closed_ts() {
        let now = Utc::now();
        for from in [
            WorkOrderStatus::Open,
            WorkOrderStatus::Assigned,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::OnHold,
        ] {
            let update = work_order(from)
                .transition(WorkOrderStatus::Cancelled, None, None, now)
                .unwrap();
            assert_eq!(update.closed_ts, Some(now));
        }
    }

    #[test]
    fn test_cannot_skip_assignment() {
        let now = Utc::now();
        assert!(work_order(WorkOrderStatus::Open)
            .transition(WorkOrderStatus::InProgress, None, None, now)
            .is_err());
        assert!(work_order(WorkOrderStatus::Assigned)
            .transition(WorkOrderStatus::Completed, None, None, now)
            .is_err());
        assert_eq!(
            work_order(WorkOrderStatus::Open)
                .transition(WorkOrderStatus::Assigned, None, None, now)
                .unwrap_err(),
            TransitionError::MissingAssignee {
                entity: "work order"
            }
        );
    }
}
