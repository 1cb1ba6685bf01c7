use crate::models::{ListPaymentsFilter, Payment, PaymentMethod, RecordPayment};
use crate::services::allocator::{validate_payment_input, BillAllocation};
use crate::services::reconciliation::{CollectionSummary, ReconciliationPolicy};
use crate::services::RecordedPayment;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::borrow::Cow;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{non_negative, positive_amount, validation_error, SortColumns};

pub const PAYMENT_SORT: SortColumns = &[
    ("paymentDate", "payment_date"),
    ("createdUtc", "created_utc"),
    ("paymentAmount", "payment_amount"),
];

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn validate_payment_request(req: &RecordPaymentRequest) -> Result<(), ValidationError> {
    validate_payment_input(
        &req.bill_ids,
        req.payment_amount,
        req.payment_method,
        req.transaction_ref.as_deref(),
    )
    .map_err(|e| {
        let mut err = ValidationError::new("payment");
        err.message = Some(Cow::Owned(e.to_string()));
        err
    })
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_payment_request"))]
pub struct RecordPaymentRequest {
    pub customer_id: Uuid,
    /// Allocation order; the first bill is settled first.
    #[validate(length(min = 1, max = 50, message = "Select between 1 and 50 bills"))]
    pub bill_ids: Vec<Uuid>,
    #[validate(custom(function = "positive_amount"))]
    pub payment_amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default = "today")]
    pub payment_date: NaiveDate,
    #[validate(length(max = 128))]
    pub transaction_ref: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(max = 128))]
    pub recorded_by: Option<String>,
}

impl From<RecordPaymentRequest> for RecordPayment {
    fn from(req: RecordPaymentRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            bill_ids: req.bill_ids,
            payment_amount: req.payment_amount,
            payment_method: req.payment_method,
            payment_date: req.payment_date,
            transaction_ref: req
                .transaction_ref
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            notes: req.notes,
            recorded_by: req.recorded_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub customer_id: Uuid,
    pub bill_id: Uuid,
    pub receipt_number: String,
    pub payment_amount: Decimal,
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.payment_id,
            customer_id: p.customer_id,
            bill_id: p.bill_id,
            receipt_number: p.receipt_number,
            payment_amount: p.payment_amount,
            payment_method: p.payment_method,
            payment_date: p.payment_date,
            transaction_ref: p.transaction_ref,
            notes: p.notes,
            recorded_by: p.recorded_by,
            created_utc: p.created_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceiptResponse {
    pub receipt_number: String,
    pub payment_amount: Decimal,
    pub total_allocated: Decimal,
    pub excess_amount: Decimal,
    pub allocations: Vec<BillAllocation>,
    pub payments: Vec<PaymentResponse>,
}

impl From<RecordedPayment> for PaymentReceiptResponse {
    fn from(recorded: RecordedPayment) -> Self {
        let plan = recorded.plan;
        Self {
            receipt_number: recorded.receipt_number,
            payment_amount: plan.total_allocated + plan.excess_amount,
            total_allocated: plan.total_allocated,
            excess_amount: plan.excess_amount,
            allocations: plan.allocations,
            payments: recorded
                .payments
                .into_iter()
                .map(PaymentResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentListParams {
    pub customer_id: Option<Uuid>,
    pub bill_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<PaymentListParams> for ListPaymentsFilter {
    fn from(params: PaymentListParams) -> Self {
        Self {
            customer_id: params.customer_id,
            bill_id: params.bill_id,
            payment_method: params.payment_method,
            start_date: params.start_date,
            end_date: params.end_date,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyCollectionsParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCollectionsResponse {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: CollectionSummary,
}

fn validate_reconciliation(req: &ReconciliationRequest) -> Result<(), ValidationError> {
    if req.end_date < req.start_date {
        return Err(validation_error(
            "date_range",
            "endDate must not be before startDate",
        ));
    }
    if req.expected.values().any(|v| non_negative(v).is_err()) {
        return Err(validation_error(
            "expected",
            "expected amounts must not be negative",
        ));
    }
    Ok(())
}

/// Expected per-method totals for a date range, with optional overrides
/// of the configured variance limits.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_reconciliation"))]
pub struct ReconciliationRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub expected: BTreeMap<PaymentMethod, Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub threshold_percent: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub review_band_percent: Option<Decimal>,
}

impl ReconciliationRequest {
    pub fn policy(&self, defaults: ReconciliationPolicy) -> Result<ReconciliationPolicy, AppError> {
        let policy = ReconciliationPolicy {
            threshold_percent: self.threshold_percent.unwrap_or(defaults.threshold_percent),
            review_band_percent: self
                .review_band_percent
                .unwrap_or(defaults.review_band_percent),
        };
        if policy.review_band_percent < policy.threshold_percent {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "reviewBandPercent ({}) must not be below thresholdPercent ({})",
                policy.review_band_percent,
                policy.threshold_percent
            )));
        }
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment_request(body: serde_json::Value) -> RecordPaymentRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_card_payment_needs_reference() {
        let bill = Uuid::new_v4();
        let req = payment_request(serde_json::json!({
            "customerId": Uuid::new_v4(),
            "billIds": [bill],
            "paymentAmount": "100.00",
            "paymentMethod": "CARD_TERMINAL"
        }));
        assert!(req.validate().is_err());

        let req = payment_request(serde_json::json!({
            "customerId": Uuid::new_v4(),
            "billIds": [bill],
            "paymentAmount": "100.00",
            "paymentMethod": "CARD_TERMINAL",
            "transactionRef": " TXN-42 "
        }));
        assert!(req.validate().is_ok());
        assert_eq!(req.payment_date, today());
        assert_eq!(
            RecordPayment::from(req).transaction_ref.as_deref(),
            Some("TXN-42")
        );
    }

    #[test]
    fn test_payment_amount_must_be_whole_cents() {
        for amount in ["999.995", "0.004"] {
            let req = payment_request(serde_json::json!({
                "customerId": Uuid::new_v4(),
                "billIds": [Uuid::new_v4()],
                "paymentAmount": amount,
                "paymentMethod": "CASH"
            }));
            let errors = req.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("payment_amount"));
        }

        let req = payment_request(serde_json::json!({
            "customerId": Uuid::new_v4(),
            "billIds": [Uuid::new_v4()],
            "paymentAmount": "999.990",
            "paymentMethod": "CASH"
        }));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_duplicate_and_empty_selection() {
        let bill = Uuid::new_v4();
        let duplicate = payment_request(serde_json::json!({
            "customerId": Uuid::new_v4(),
            "billIds": [bill, bill],
            "paymentAmount": "100.00",
            "paymentMethod": "CASH"
        }));
        assert!(duplicate.validate().is_err());

        let empty = payment_request(serde_json::json!({
            "customerId": Uuid::new_v4(),
            "billIds": [],
            "paymentAmount": "100.00",
            "paymentMethod": "CASH"
        }));
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("bill_ids"));
    }

    #[test]
    fn test_reconciliation_policy_overrides() {
        let req: ReconciliationRequest = serde_json::from_value(serde_json::json!({
            "startDate": "2024-03-01",
            "endDate": "2024-03-31",
            "expected": {"CASH": "3100.00", "BANK_TRANSFER": "1000"},
            "thresholdPercent": "1"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.expected[&PaymentMethod::Cash], dec!(3100.00));

        let policy = req.policy(ReconciliationPolicy::default()).unwrap();
        assert_eq!(policy.threshold_percent, dec!(1));
        assert_eq!(policy.review_band_percent, dec!(5));

        let inverted: ReconciliationRequest = serde_json::from_value(serde_json::json!({
            "startDate": "2024-03-01",
            "endDate": "2024-03-31",
            "thresholdPercent": "10"
        }))
        .unwrap();
        assert!(matches!(
            inverted.policy(ReconciliationPolicy::default()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_reconciliation_rejects_inverted_range() {
        let req: ReconciliationRequest = serde_json::from_value(serde_json::json!({
            "startDate": "2024-03-31",
            "endDate": "2024-03-01"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
