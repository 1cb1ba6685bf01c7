use crate::models::{
    Bill, BillStatus, BillStatusTotals, BillTax, CreateBill, CreateBillTax, ListBillsFilter,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{non_negative, non_negative_amount, validation_error, SortColumns};

pub const BILL_SORT: SortColumns = &[
    ("createdUtc", "created_utc"),
    ("dueDate", "due_date"),
    ("totalAmount", "total_amount"),
    ("billingPeriodStart", "billing_period_start"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillTaxRequest {
    #[validate(length(min = 1, max = 64, message = "Tax name is required"))]
    pub tax_name: String,
    #[validate(custom(function = "non_negative"))]
    pub rate_percent_applied: Decimal,
    #[validate(custom(function = "non_negative_amount"))]
    pub taxable_base_amount: Decimal,
}

fn validate_period(req: &CreateBillRequest) -> Result<(), ValidationError> {
    if req.billing_period_end < req.billing_period_start {
        return Err(validation_error(
            "billing_period",
            "billingPeriodEnd must not be before billingPeriodStart",
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_period"))]
pub struct CreateBillRequest {
    pub customer_id: Uuid,
    pub meter_id: Uuid,
    pub billing_period_start: NaiveDate,
    pub billing_period_end: NaiveDate,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub energy_charge_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub fixed_charge_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub subsidy_amount: Decimal,
    #[serde(default)]
    #[validate(custom(function = "non_negative_amount"))]
    pub solar_export_credit: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub taxes: Vec<CreateBillTaxRequest>,
    pub due_date: NaiveDate,
}

impl From<CreateBillRequest> for CreateBill {
    fn from(req: CreateBillRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            meter_id: req.meter_id,
            billing_period_start: req.billing_period_start,
            billing_period_end: req.billing_period_end,
            energy_charge_amount: req.energy_charge_amount,
            fixed_charge_amount: req.fixed_charge_amount,
            subsidy_amount: req.subsidy_amount,
            solar_export_credit: req.solar_export_credit,
            taxes: req
                .taxes
                .into_iter()
                .map(|t| CreateBillTax {
                    tax_name: t.tax_name,
                    rate_percent_applied: t.rate_percent_applied,
                    taxable_base_amount: t.taxable_base_amount,
                })
                .collect(),
            due_date: req.due_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillListParams {
    pub customer_id: Option<Uuid>,
    pub meter_id: Option<Uuid>,
    pub status: Option<BillStatus>,
}

impl From<BillListParams> for ListBillsFilter {
    fn from(params: BillListParams) -> Self {
        Self {
            customer_id: params.customer_id,
            meter_id: params.meter_id,
            status: params.status,
            overdue_as_of: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummaryParams {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueParams {
    pub customer_id: Option<Uuid>,
    /// Defaults to today (UTC).
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOverdueParams {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillTaxResponse {
    pub tax_name: String,
    pub rate_percent_applied: Decimal,
    pub taxable_base_amount: Decimal,
    pub tax_amount: Decimal,
}

impl From<BillTax> for BillTaxResponse {
    fn from(t: BillTax) -> Self {
        Self {
            tax_name: t.tax_name,
            rate_percent_applied: t.rate_percent_applied,
            taxable_base_amount: t.taxable_base_amount,
            tax_amount: t.tax_amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
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
    pub outstanding_amount: Decimal,
    pub due_date: NaiveDate,
    pub bill_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Vec<BillTaxResponse>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<Bill> for BillResponse {
    fn from(b: Bill) -> Self {
        Self {
            outstanding_amount: b.outstanding_amount(),
            bill_id: b.bill_id,
            customer_id: b.customer_id,
            meter_id: b.meter_id,
            billing_period_start: b.billing_period_start,
            billing_period_end: b.billing_period_end,
            energy_charge_amount: b.energy_charge_amount,
            fixed_charge_amount: b.fixed_charge_amount,
            subsidy_amount: b.subsidy_amount,
            solar_export_credit: b.solar_export_credit,
            tax_amount: b.tax_amount,
            total_amount: b.total_amount,
            amount_paid: b.amount_paid,
            due_date: b.due_date,
            bill_status: b.bill_status,
            taxes: None,
            created_utc: b.created_utc,
            updated_utc: b.updated_utc,
        }
    }
}

impl BillResponse {
    pub fn with_taxes(bill: Bill, taxes: Vec<BillTax>) -> Self {
        let mut response = Self::from(bill);
        response.taxes = Some(taxes.into_iter().map(BillTaxResponse::from).collect());
        response
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BillStatusSummary {
    pub status: String,
    pub count: i64,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub outstanding_amount: Decimal,
}

/// Per-status counts plus billed/paid/outstanding totals. VOIDED bills are
/// listed but excluded from the totals.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BillSummaryResponse {
    pub by_status: Vec<BillStatusSummary>,
    pub bill_count: i64,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
}

impl From<Vec<BillStatusTotals>> for BillSummaryResponse {
    fn from(rows: Vec<BillStatusTotals>) -> Self {
        let mut summary = BillSummaryResponse {
            by_status: Vec::with_capacity(rows.len()),
            bill_count: 0,
            total_billed: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            total_outstanding: Decimal::ZERO,
        };

        for row in rows {
            let outstanding = (row.total_amount - row.amount_paid).max(Decimal::ZERO);
            summary.bill_count += row.bill_count;
            if row.bill_status != BillStatus::Voided.as_str() {
                summary.total_billed += row.total_amount;
                summary.total_paid += row.amount_paid;
                summary.total_outstanding += outstanding;
            }
            summary.by_status.push(BillStatusSummary {
                status: row.bill_status,
                count: row.bill_count,
                total_amount: row.total_amount,
                amount_paid: row.amount_paid,
                outstanding_amount: outstanding,
            });
        }
        summary
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOverdueResponse {
    pub as_of: NaiveDate,
    pub updated_count: u64,
}
