//! Complaint model and its lifecycle.

use super::{ParseEnumError, TransitionError};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplaintStatus {
    Open,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Open => "OPEN",
            ComplaintStatus::Assigned => "ASSIGNED",
            ComplaintStatus::InProgress => "IN_PROGRESS",
            ComplaintStatus::Resolved => "RESOLVED",
            ComplaintStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(ComplaintStatus::Open),
            "ASSIGNED" => Ok(ComplaintStatus::Assigned),
            "IN_PROGRESS" => Ok(ComplaintStatus::InProgress),
            "RESOLVED" => Ok(ComplaintStatus::Resolved),
            "CLOSED" => Ok(ComplaintStatus::Closed),
            other => Err(ParseEnumError::new("complaint status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComplaintAction {
    Assign { employee_id: Option<Uuid> },
    Start,
    Resolve { notes: Option<String> },
    Close { notes: Option<String> },
}

impl ComplaintAction {
    fn as_str(&self) -> &'static str {
        match self {
            ComplaintAction::Assign { .. } => "assign",
            ComplaintAction::Start => "start",
            ComplaintAction::Resolve { .. } => "resolve",
            ComplaintAction::Close { .. } => "close",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Complaint {
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

/// Column values to persist after a complaint transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplaintUpdate {
    pub status: ComplaintStatus,
    pub assigned_employee_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolved_date: Option<DateTime<Utc>>,
    pub resolution_time_hours: Option<Decimal>,
}

/// Hours between two instants, to two decimal places.
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let seconds = (end - start).num_seconds().max(0);
    (Decimal::from(seconds) / Decimal::from(3600))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl Complaint {
    pub fn status(&self) -> Result<ComplaintStatus, ParseEnumError> {
        self.status.parse()
    }

    /// Resolve `action` against the transition table at time `now`.
    pub fn transition(
        &self,
        action: ComplaintAction,
        now: DateTime<Utc>,
    ) -> Result<ComplaintUpdate, TransitionError> {
        use ComplaintStatus as S;

        let from = self
            .status()
            .map_err(|_| TransitionError::Invalid {
                entity: "complaint",
                from: "UNKNOWN",
                action: action.as_str(),
            })?;

        let mut update = ComplaintUpdate {
            status: from,
            assigned_employee_id: self.assigned_employee_id,
            resolution_notes: self.resolution_notes.clone(),
            resolved_date: self.resolved_date,
            resolution_time_hours: self.resolution_time_hours,
        };

        let invalid = |action: &ComplaintAction| TransitionError::Invalid {
            entity: "complaint",
            from: from.as_str(),
            action: action.as_str(),
        };

        match (from, &action) {
            (S::Open | S::Assigned | S::InProgress, ComplaintAction::Assign { employee_id }) => {
                let employee_id = employee_id.ok_or(TransitionError::MissingAssignee {
                    entity: "complaint",
                })?;
                update.status = S::Assigned;
                update.assigned_employee_id = Some(employee_id);
            }
            (S::Assigned, ComplaintAction::Start) => {
                update.status = S::InProgress;
            }
            (S::Assigned | S::InProgress, ComplaintAction::Resolve { notes }) => {
                update.status = S::Resolved;
                update.resolved_date = Some(now);
                update.resolution_time_hours = Some(hours_between(self.created_utc, now));
                if notes.is_some() {
                    update.resolution_notes = notes.clone();
                }
            }
            (S::Open | S::Assigned | S::InProgress | S::Resolved, ComplaintAction::Close { notes }) => {
                update.status = S::Closed;
                if update.resolved_date.is_none() {
                    update.resolved_date = Some(now);
                    update.resolution_time_hours = Some(hours_between(self.created_utc, now));
                }
                if notes.is_some() {
                    update.resolution_notes = notes.clone();
                }
            }
            _ => return Err(invalid(&action)),
        }

        Ok(update)
    }
}

#[derive(Debug, Clone)]
pub struct CreateComplaint {
    pub customer_id: Uuid,
    pub complaint_type: String,
    pub description: String,
}

/// Filter parameters for listing complaints.
#[derive(Debug, Clone, Default)]
pub struct ListComplaintsFilter {
    pub status: Option<ComplaintStatus>,
    pub customer_id: Option<Uuid>,
    pub assigned_employee_id: Option<Uuid>,
    pub complaint_type: Option<String>,
}
