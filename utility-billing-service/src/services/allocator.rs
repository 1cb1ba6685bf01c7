//! Multi-bill payment allocation.
//!
//! A cashier payment is spread over the selected bills strictly in the order
//! the cashier chose them. Whatever is left after the last bill is reported as
//! excess and never applied.

use crate::models::{Bill, BillStatus, PaymentMethod};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("at least one bill must be selected")]
    EmptySelection,

    #[error("payment amount must be greater than zero")]
    NonPositiveAmount,

    #[error("payment amount {0} has fractional cents")]
    FractionalCents(Decimal),

    #[error("transaction reference is required for {0} payments")]
    MissingTransactionRef(&'static str),

    #[error("bill {0} was selected more than once")]
    DuplicateBill(Uuid),

    #[error("bill {0} is voided and cannot take payments")]
    VoidedBill(Uuid),
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// Bill state the allocator needs, as read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingBill {
    pub bill_id: Uuid,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub status: BillStatus,
}

impl OutstandingBill {
    pub fn outstanding(&self) -> Decimal {
        (self.total_amount - self.amount_paid).max(Decimal::ZERO)
    }
}

impl TryFrom<&Bill> for OutstandingBill {
    type Error = AppError;

    fn try_from(bill: &Bill) -> Result<Self, Self::Error> {
        Ok(Self {
            bill_id: bill.bill_id,
            total_amount: bill.total_amount,
            amount_paid: bill.amount_paid,
            status: bill.status().map_err(|e| AppError::InternalError(e.into()))?,
        })
    }
}

/// One bill's share of the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillAllocation {
    pub bill_id: Uuid,
    pub outstanding_before: Decimal,
    pub allocated_amount: Decimal,
    pub outstanding_after: Decimal,
    pub is_fully_paid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// One entry per selected bill, in selection order.
    pub allocations: Vec<BillAllocation>,
    pub total_allocated: Decimal,
    pub excess_amount: Decimal,
}

impl AllocationPlan {
    /// Allocations that actually move money.
    pub fn applied(&self) -> impl Iterator<Item = &BillAllocation> {
        self.allocations
            .iter()
            .filter(|a| a.allocated_amount > Decimal::ZERO)
    }
}

/// Receipt number shared by every bill row of one cashier payment,
/// e.g. `RCP-20240315-1A2B3C4D`.
pub fn receipt_number(prefix: &str, payment_date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        payment_date.format("%Y%m%d"),
        suffix[..8].to_uppercase()
    )
}

/// Field-level checks that must pass before any bill is read.
pub fn validate_payment_input(
    bill_ids: &[Uuid],
    payment_amount: Decimal,
    payment_method: PaymentMethod,
    transaction_ref: Option<&str>,
) -> Result<(), AllocationError> {
    if bill_ids.is_empty() {
        return Err(AllocationError::EmptySelection);
    }
    if payment_amount <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveAmount);
    }
    if payment_amount.normalize().scale() > 2 {
        return Err(AllocationError::FractionalCents(payment_amount));
    }
    let has_ref = transaction_ref.is_some_and(|r| !r.trim().is_empty());
    if payment_method.requires_transaction_ref() && !has_ref {
        return Err(AllocationError::MissingTransactionRef(
            payment_method.as_str(),
        ));
    }

    let mut seen = HashSet::with_capacity(bill_ids.len());
    for id in bill_ids {
        if !seen.insert(*id) {
            return Err(AllocationError::DuplicateBill(*id));
        }
    }
    Ok(())
}

/// Spread `payment_amount` over `bills` in the given order.
///
/// Invariant: `sum(allocated_amount) + excess_amount == payment_amount`.
pub fn allocate_payment(
    payment_amount: Decimal,
    bills: &[OutstandingBill],
) -> Result<AllocationPlan, AllocationError> {
    if bills.is_empty() {
        return Err(AllocationError::EmptySelection);
    }
    if payment_amount <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveAmount);
    }
    if let Some(voided) = bills.iter().find(|b| b.status == BillStatus::Voided) {
        return Err(AllocationError::VoidedBill(voided.bill_id));
    }

    let mut remaining = payment_amount;
    let mut allocations = Vec::with_capacity(bills.len());

    for bill in bills {
        let outstanding_before = bill.outstanding();
        let allocated_amount = remaining.min(outstanding_before);
        let outstanding_after = outstanding_before - allocated_amount;
        remaining -= allocated_amount;

        allocations.push(BillAllocation {
            bill_id: bill.bill_id,
            outstanding_before,
            allocated_amount,
            outstanding_after,
            is_fully_paid: outstanding_after.is_zero(),
        });
    }

    Ok(AllocationPlan {
        allocations,
        total_allocated: payment_amount - remaining,
        excess_amount: remaining,
    })
}
