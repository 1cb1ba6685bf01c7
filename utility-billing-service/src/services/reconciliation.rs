//! Collection aggregation and reconciliation against expected totals.

use crate::models::PaymentMethod;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimal view of a payment row needed for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectedPayment {
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
}

/// Variance limits, both in percent of the expected amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationPolicy {
    /// A category exceeds when `|variance_percent|` is strictly above this.
    pub threshold_percent: Decimal,
    /// Exceeding categories at or below this only need review.
    pub review_band_percent: Decimal,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            threshold_percent: Decimal::from(2),
            review_band_percent: Decimal::from(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Balanced,
    NeedsReview,
    DiscrepancyFound,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Balanced => "BALANCED",
            ReconciliationStatus::NeedsReview => "NEEDS_REVIEW",
            ReconciliationStatus::DiscrepancyFound => "DISCREPANCY_FOUND",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub payment_method: PaymentMethod,
    pub count: u64,
    pub amount: Decimal,
    pub expected_amount: Option<Decimal>,
    pub variance: Option<Decimal>,
    /// `None` when there is no expectation or the expectation is zero.
    pub variance_percent: Option<Decimal>,
    pub exceeds_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub categories: Vec<CategorySummary>,
    pub payment_count: u64,
    pub actual_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub categories: Vec<CategorySummary>,
    pub payment_count: u64,
    pub actual_total: Decimal,
    pub expected_total: Decimal,
    pub total_variance: Decimal,
    pub threshold_percent: Decimal,
    pub review_band_percent: Decimal,
    pub status: ReconciliationStatus,
}

fn group(payments: &[CollectedPayment]) -> BTreeMap<PaymentMethod, (u64, Decimal)> {
    let mut groups: BTreeMap<PaymentMethod, (u64, Decimal)> = BTreeMap::new();
    for p in payments {
        let entry = groups.entry(p.payment_method).or_default();
        entry.0 += 1;
        entry.1 += p.amount;
    }
    groups
}

/// Group payments by method with no expectations attached.
pub fn summarize_collections(payments: &[CollectedPayment]) -> CollectionSummary {
    let categories: Vec<CategorySummary> = group(payments)
        .into_iter()
        .map(|(payment_method, (count, amount))| CategorySummary {
            payment_method,
            count,
            amount,
            expected_amount: None,
            variance: None,
            variance_percent: None,
            exceeds_threshold: false,
        })
        .collect();

    CollectionSummary {
        payment_count: categories.iter().map(|c| c.count).sum(),
        actual_total: categories.iter().map(|c| c.amount).sum(),
        categories,
    }
}

/// Compare actual collections to `expected` per payment method.
pub fn reconcile(
    payments: &[CollectedPayment],
    expected: &BTreeMap<PaymentMethod, Decimal>,
    policy: &ReconciliationPolicy,
) -> ReconciliationReport {
    let mut groups = group(payments);
    for method in expected.keys() {
        groups.entry(*method).or_default();
    }

    let categories: Vec<CategorySummary> = groups
        .into_iter()
        .map(|(payment_method, (count, amount))| {
            let mut category = CategorySummary {
                payment_method,
                count,
                amount,
                expected_amount: None,
                variance: None,
                variance_percent: None,
                exceeds_threshold: false,
            };

            if let Some(&expected_amount) = expected.get(&payment_method) {
                let variance = amount - expected_amount;
                category.expected_amount = Some(expected_amount);
                category.variance = Some(variance);

                if expected_amount.is_zero() {
                    category.exceeds_threshold = !amount.is_zero();
                } else {
                    let percent = (variance / expected_amount * Decimal::ONE_HUNDRED)
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                    category.variance_percent = Some(percent);
                    category.exceeds_threshold = percent.abs() > policy.threshold_percent;
                }
            }
            category
        })
        .collect();

    let status = overall_status(&categories, policy);
    let actual_total: Decimal = categories.iter().map(|c| c.amount).sum();
    let expected_total: Decimal = expected.values().copied().sum();

    ReconciliationReport {
        payment_count: categories.iter().map(|c| c.count).sum(),
        actual_total,
        expected_total,
        total_variance: actual_total - expected_total,
        threshold_percent: policy.threshold_percent,
        review_band_percent: policy.review_band_percent,
        status,
        categories,
    }
}

fn overall_status(
    categories: &[CategorySummary],
    policy: &ReconciliationPolicy,
) -> ReconciliationStatus {
    let mut exceeding = categories.iter().filter(|c| c.exceeds_threshold).peekable();
    if exceeding.peek().is_none() {
        return ReconciliationStatus::Balanced;
    }

    let within_band = exceeding.all(|c| {
        c.variance_percent
            .is_some_and(|p| p.abs() <= policy.review_band_percent)
    });
    if within_band {
        ReconciliationStatus::NeedsReview
    } else {
        ReconciliationStatus::DiscrepancyFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn paid(method: PaymentMethod, amount: Decimal) -> CollectedPayment {
        CollectedPayment {
            payment_method: method,
            amount,
        }
    }

    fn sample() -> Vec<CollectedPayment> {
        vec![
            paid(PaymentMethod::Cash, dec!(1000)),
            paid(PaymentMethod::CardTerminal, dec!(250.50)),
            paid(PaymentMethod::Cash, dec!(500)),
            paid(PaymentMethod::BankTransfer, dec!(2000)),
            paid(PaymentMethod::CardTerminal, dec!(49.50)),
        ]
    }

    #[test]
    fn test_category_sums_add_up_to_actual_total() {
        let summary = summarize_collections(&sample());

        assert_eq!(summary.payment_count, 5);
        assert_eq!(summary.actual_total, dec!(3800));
        let sum: Decimal = summary.categories.iter().map(|c| c.amount).sum();
        assert_eq!(sum, summary.actual_total);

        let cash = &summary.categories[0];
        assert_eq!(cash.payment_method, PaymentMethod::Cash);
        assert_eq!(cash.count, 2);
        assert_eq!(cash.amount, dec!(1500));
    }

    #[test]
    fn test_result_does_not_depend_on_input_order() {
        let expected = BTreeMap::from([
            (PaymentMethod::Cash, dec!(1500)),
            (PaymentMethod::CardTerminal, dec!(310)),
        ]);
        let policy = ReconciliationPolicy::default();

        let forward = reconcile(&sample(), &expected, &policy);
        let mut reversed = sample();
        reversed.reverse();
        let backward = reconcile(&reversed, &expected, &policy);

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_balanced_within_threshold() {
        let expected = BTreeMap::from([
            (PaymentMethod::Cash, dec!(1510)),
            (PaymentMethod::BankTransfer, dec!(2000)),
        ]);
        let report = reconcile(&sample(), &expected, &ReconciliationPolicy::default());

        let cash = &report.categories[0];
        assert_eq!(cash.variance, Some(dec!(-10)));
        assert_eq!(cash.variance_percent, Some(dec!(-0.66)));
        assert!(!cash.exceeds_threshold);
        assert_eq!(report.status, ReconciliationStatus::Balanced);
    }

    #[test]
    fn test_needs_review_inside_band() {
        // card: 300 actual vs 310 expected = -3.23%
        let expected = BTreeMap::from([(PaymentMethod::CardTerminal, dec!(310))]);
        let report = reconcile(&sample(), &expected, &ReconciliationPolicy::default());

        let card = report
            .categories
            .iter()
            .find(|c| c.payment_method == PaymentMethod::CardTerminal)
            .unwrap();
        assert_eq!(card.variance_percent, Some(dec!(-3.23)));
        assert!(card.exceeds_threshold);
        assert_eq!(report.status, ReconciliationStatus::NeedsReview);
    }

    #[test]
    fn test_discrepancy_outside_band() {
        let expected = BTreeMap::from([(PaymentMethod::Cash, dec!(1000))]);
        let report = reconcile(&sample(), &expected, &ReconciliationPolicy::default());
        assert_eq!(report.categories[0].variance_percent, Some(dec!(50)));
        assert_eq!(report.status, ReconciliationStatus::DiscrepancyFound);
    }

    #[test]
    fn test_expected_only_category_is_reported() {
        let expected = BTreeMap::from([(PaymentMethod::Cheque, dec!(100))]);
        let report = reconcile(&sample(), &expected, &ReconciliationPolicy::default());

        let cheque = report
            .categories
            .iter()
            .find(|c| c.payment_method == PaymentMethod::Cheque)
            .unwrap();
        assert_eq!(cheque.count, 0);
        assert_eq!(cheque.amount, Decimal::ZERO);
        assert_eq!(cheque.variance_percent, Some(dec!(-100)));
        assert_eq!(report.status, ReconciliationStatus::DiscrepancyFound);
        assert_eq!(report.expected_total, dec!(100));
        assert_eq!(report.total_variance, dec!(3700));
    }

    #[test]
    fn test_zero_expectation() {
        let expected = BTreeMap::from([
            (PaymentMethod::Online, Decimal::ZERO),
            (PaymentMethod::Cash, dec!(1500)),
        ]);
        let report = reconcile(&sample(), &expected, &ReconciliationPolicy::default());
        let online = report
            .categories
            .iter()
            .find(|c| c.payment_method == PaymentMethod::Online)
            .unwrap();
        assert_eq!(online.variance_percent, None);
        assert!(!online.exceeds_threshold);
        assert_eq!(report.status, ReconciliationStatus::Balanced);

        let expected = BTreeMap::from([(PaymentMethod::Cash, Decimal::ZERO)]);
        let report = reconcile(&sample(), &expected, &ReconciliationPolicy::default());
        assert!(report.categories[0].exceeds_threshold);
        assert_eq!(report.status, ReconciliationStatus::DiscrepancyFound);
    }

    #[test]
    fn test_policy_is_configurable() {
        let expected = BTreeMap::from([(PaymentMethod::Cash, dec!(1000))]);
        let lenient = ReconciliationPolicy {
            threshold_percent: dec!(60),
            review_band_percent: dec!(80),
        };
        assert_eq!(
            reconcile(&sample(), &expected, &lenient).status,
            ReconciliationStatus::Balanced
        );
    }
}
