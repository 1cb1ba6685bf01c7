//! Bill model for utility-billing-service.

use super::{ParseEnumError, TransitionError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Bill status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Voided,
}

/// Status changes a bill goes through outside of creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillAction {
    Void,
    MarkOverdue,
    /// A payment allocation left this much outstanding.
    ApplyPayment { outstanding_after: Decimal },
}

impl BillAction {
    fn as_str(&self) -> &'static str {
        match self {
            BillAction::Void => "void",
            BillAction::MarkOverdue => "mark overdue",
            BillAction::ApplyPayment { .. } => "apply payment to",
        }
    }
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "PENDING",
            BillStatus::Partial => "PARTIAL",
            BillStatus::Paid => "PAID",
            BillStatus::Overdue => "OVERDUE",
            BillStatus::Voided => "VOIDED",
        }
    }

    /// Status a newly issued bill starts in. Zero-total bills are void, not paid.
    pub fn initial(total_amount: Decimal) -> Self {
        if total_amount.is_zero() {
            BillStatus::Voided
        } else {
            BillStatus::Pending
        }
    }

    /// Statuses that still expect money.
    pub fn is_collectable(&self) -> bool {
        matches!(
            self,
            BillStatus::Pending | BillStatus::Partial | BillStatus::Overdue
        )
    }

    /// A partial payment on an OVERDUE bill moves it to PARTIAL; the next
    /// overdue sweep flags it again while its due date is past.
    pub fn apply(self, action: BillAction) -> Result<BillStatus, TransitionError> {
        use BillStatus as S;

        let next = match (self, action) {
            (S::Pending | S::Overdue, BillAction::Void) => S::Voided,
            (S::Pending | S::Partial, BillAction::MarkOverdue) => S::Overdue,
            (
                S::Pending | S::Partial | S::Overdue,
                BillAction::ApplyPayment { outstanding_after },
            ) => {
                if outstanding_after.is_zero() {
                    S::Paid
                } else {
                    S::Partial
                }
            }
            (from, action) => {
                return Err(TransitionError::Invalid {
                    entity: "bill",
                    from: from.as_str(),
                    action: action.as_str(),
                })
            }
        };
        Ok(next)
    }
}

impl FromStr for BillStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BillStatus::Pending),
            "PARTIAL" => Ok(BillStatus::Partial),
            "PAID" => Ok(BillStatus::Paid),
            "OVERDUE" => Ok(BillStatus::Overdue),
            "VOIDED" => Ok(BillStatus::Voided),
            other => Err(ParseEnumError::new("bill status", other)),
        }
    }
}

/// Bill for one meter and billing period.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bill {
    pub bill_id: Uuid,
    pub customer_id: Uuid,
    pub meter_id: Uuid,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub energy_charge_amount: Decimal,
    pub fixed_charge_amount: Decimal,
    pub subsidy_amount: Decimal,
    pub solar_export_credit: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub due_date: NaiveDate,
    pub bill_status: String,
    pub version: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Bill {
    pub fn outstanding_amount(&self) -> Decimal {
        (self.total_amount - self.amount_paid).max(Decimal::ZERO)
    }

    pub fn status(&self) -> Result<BillStatus, ParseEnumError> {
        self.bill_status.parse()
    }
}

/// Tax line applied to a bill.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillTax {
    pub bill_tax_id: Uuid,
    pub bill_id: Uuid,
    pub tax_name: String,
    pub rate_percent_applied: Decimal,
    pub taxable_base_amount: Decimal,
    pub tax_amount: Decimal,
    pub sort_order: i32,
}

#[derive(Debug, Clone)]
pub struct CreateBillTax {
    pub tax_name: String,
    pub rate_percent_applied: Decimal,
    pub taxable_base_amount: Decimal,
}

/// Input for issuing a bill.
#[derive(Debug, Clone)]
pub struct CreateBill {
    pub customer_id: Uuid,
    pub meter_id: Uuid,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    pub energy_charge_amount: Decimal,
    pub fixed_charge_amount: Decimal,
    pub subsidy_amount: Decimal,
    pub solar_export_credit: Decimal,
    pub taxes: Vec<CreateBillTax>,
    pub due_date: NaiveDate,
}

/// Filter parameters for listing bills.
#[derive(Debug, Clone, Default)]
pub struct ListBillsFilter {
    pub customer_id: Option<Uuid>,
    pub meter_id: Option<Uuid>,
    pub status: Option<BillStatus>,
    /// Only collectable bills whose due date is before this day.
    pub overdue_as_of: Option<NaiveDate>,
}

/// Aggregate per bill status for the summary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillStatusTotals {
    pub bill_status: String,
    pub bill_count: i64,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
}
