//! Bill total calculation.
//!
//! All arithmetic is done in [`Decimal`]; tax lines and the final total are
//! rounded to cents so repeated tax lines never accumulate binary drift.

use crate::models::{CreateBill, CreateBillTax};
use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a currency amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One tax line: `taxable_base_amount * rate_percent_applied / 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxLine {
    pub taxable_base_amount: Decimal,
    pub rate_percent_applied: Decimal,
}

impl TaxLine {
    pub fn amount(&self) -> Decimal {
        round_money(self.taxable_base_amount * self.rate_percent_applied / HUNDRED)
    }
}

impl From<&CreateBillTax> for TaxLine {
    fn from(tax: &CreateBillTax) -> Self {
        Self {
            taxable_base_amount: tax.taxable_base_amount,
            rate_percent_applied: tax.rate_percent_applied,
        }
    }
}

/// Charge components of a bill.
#[derive(Debug, Clone, Default)]
pub struct BillCharges {
    pub energy_charge_amount: Decimal,
    pub fixed_charge_amount: Decimal,
    pub subsidy_amount: Decimal,
    pub solar_export_credit: Decimal,
    pub taxes: Vec<TaxLine>,
}

impl From<&CreateBill> for BillCharges {
    fn from(bill: &CreateBill) -> Self {
        Self {
            energy_charge_amount: bill.energy_charge_amount,
            fixed_charge_amount: bill.fixed_charge_amount,
            subsidy_amount: bill.subsidy_amount,
            solar_export_credit: bill.solar_export_credit,
            taxes: bill.taxes.iter().map(TaxLine::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub after_credits: Decimal,
    /// Per-line tax amounts, in input order.
    pub tax_lines: Vec<Decimal>,
    pub tax_amount: Decimal,
    /// Never negative.
    pub total_amount: Decimal,
}

pub fn calculate_bill_total(charges: &BillCharges) -> BillTotals {
    let subtotal = charges.energy_charge_amount + charges.fixed_charge_amount;
    let after_credits = subtotal - charges.subsidy_amount - charges.solar_export_credit;

    let tax_lines: Vec<Decimal> = charges.taxes.iter().map(TaxLine::amount).collect();
    let tax_amount: Decimal = tax_lines.iter().copied().sum();

    let total_amount = round_money((after_credits + tax_amount).max(Decimal::ZERO));

    BillTotals {
        subtotal,
        after_credits,
        tax_lines,
        tax_amount,
        total_amount,
    }
}
