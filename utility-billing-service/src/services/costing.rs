//! Work order cost and duration rollups.

use crate::models::{WorkOrderItemUsage, WorkOrderLabor, WorkOrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;

/// Labor at the snapshot rate plus item costs.
pub fn work_order_total_cost(labor: &[WorkOrderLabor], items: &[WorkOrderItemUsage]) -> Decimal {
    let labor_cost: Decimal = labor.iter().map(|l| l.hours * l.hourly_rate_snapshot).sum();
    let item_cost: Decimal = items.iter().map(|i| i.item_cost_amount).sum();
    labor_cost + item_cost
}

/// Scheduled duration in hours, one decimal place.
pub fn duration_hours(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Option<Decimal> {
    let (start, end) = (start?, end?);
    let seconds = (end - start).num_seconds();
    Some(
        (Decimal::from(seconds) / Decimal::from(3600))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
    )
}

/// Per-order figures the statistics query returns.
#[derive(Debug, Clone, FromRow)]
pub struct WorkOrderCostRow {
    pub status: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub labor_cost: Decimal,
    pub item_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderStatistics {
    pub total: u64,
    pub open: u64,
    pub by_status: BTreeMap<String, u64>,
    pub completed_total_cost: Decimal,
    pub average_duration_hours: Option<Decimal>,
}

pub fn work_order_statistics(rows: &[WorkOrderCostRow]) -> WorkOrderStatistics {
    let mut by_status: BTreeMap<String, u64> = WorkOrderStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut open = 0;
    let mut completed_total_cost = Decimal::ZERO;
    let mut durations = Vec::new();

    for row in rows {
        *by_status.entry(row.status.clone()).or_default() += 1;

        match row.status.parse::<WorkOrderStatus>() {
            Ok(WorkOrderStatus::Completed) => {
                completed_total_cost += row.labor_cost + row.item_cost;
            }
            Ok(status) if !status.is_terminal() => open += 1,
            _ => {}
        }

        if let Some(hours) = duration_hours(row.scheduled_start, row.scheduled_end) {
            durations.push(hours);
        }
    }

    let average_duration_hours = if durations.is_empty() {
        None
    } else {
        let sum: Decimal = durations.iter().copied().sum();
        Some(
            (sum / Decimal::from(durations.len()))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
        )
    };

    WorkOrderStatistics {
        total: rows.len() as u64,
        open,
        by_status,
        completed_total_cost,
        average_duration_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn labor(hours: Decimal, rate: Decimal) -> WorkOrderLabor {
        WorkOrderLabor {
            labor_id: Uuid::new_v4(),
            work_order_id: Uuid::nil(),
            employee_id: Uuid::new_v4(),
            hours,
            hourly_rate_snapshot: rate,
            created_utc: Utc::now(),
        }
    }

    fn item(cost: Decimal) -> WorkOrderItemUsage {
        WorkOrderItemUsage {
            item_usage_id: Uuid::new_v4(),
            work_order_id: Uuid::nil(),
            item_name: "Meter seal".to_string(),
            quantity: dec!(1),
            item_cost_amount: cost,
            created_utc: Utc::now(),
        }
    }

    fn row(status: WorkOrderStatus, hours: Option<i64>, cost: Decimal) -> WorkOrderCostRow {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        WorkOrderCostRow {
            status: status.as_str().to_string(),
            scheduled_start: hours.map(|_| start),
            scheduled_end: hours.map(|h| start + chrono::Duration::minutes(h)),
            labor_cost: cost,
            item_cost: Decimal::ZERO,
        }
    }

    #[test]
    fn test_total_cost() {
        let cost = work_order_total_cost(
            &[labor(dec!(2.5), dec!(400)), labor(dec!(1), dec!(350))],
            &[item(dec!(120.75))],
        );
        assert_eq!(cost, dec!(1470.75));
        assert_eq!(work_order_total_cost(&[], &[]), Decimal::ZERO);
    }

    #[test]
    fn test_duration_rounds_to_one_place() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let end = start + chrono::Duration::minutes(100);
        assert_eq!(duration_hours(Some(start), Some(end)), Some(dec!(1.7)));
        assert_eq!(duration_hours(Some(start), None), None);
        assert_eq!(duration_hours(None, Some(end)), None);
    }

    #[test]
    fn test_statistics() {
        // durations given in minutes: 120 and 60
        let stats = work_order_statistics(&[
            row(WorkOrderStatus::Completed, Some(120), dec!(500)),
            row(WorkOrderStatus::Completed, None, dec!(250)),
            row(WorkOrderStatus::Cancelled, Some(60), dec!(999)),
            row(WorkOrderStatus::InProgress, None, dec!(10)),
            row(WorkOrderStatus::Open, None, Decimal::ZERO),
        ]);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.open, 2);
        assert_eq!(stats.by_status["COMPLETED"], 2);
        assert_eq!(stats.by_status["ON_HOLD"], 0);
        assert_eq!(stats.completed_total_cost, dec!(750));
        assert_eq!(stats.average_duration_hours, Some(dec!(1.5)));
    }

    #[test]
    fn test_statistics_empty() {
        let stats = work_order_statistics(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_duration_hours, None);
    }
}
