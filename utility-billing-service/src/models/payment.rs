//! Payment model for utility-billing-service.

use super::ParseEnumError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Settlement channel. Every method except CASH needs a transaction reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    CardTerminal,
    BankTransfer,
    Cheque,
    MobileWallet,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::CardTerminal => "CARD_TERMINAL",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Cheque => "CHEQUE",
            PaymentMethod::MobileWallet => "MOBILE_WALLET",
            PaymentMethod::Online => "ONLINE",
        }
    }

    pub fn requires_transaction_ref(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD_TERMINAL" => Ok(PaymentMethod::CardTerminal),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "CHEQUE" => Ok(PaymentMethod::Cheque),
            "MOBILE_WALLET" => Ok(PaymentMethod::MobileWallet),
            "ONLINE" => Ok(PaymentMethod::Online),
            other => Err(ParseEnumError::new("payment method", other)),
        }
    }
}

/// One bill's share of a cashier payment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
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

/// Input for a cashier payment spread over one or more bills.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub customer_id: Uuid,
    /// Allocation order as chosen by the cashier.
    pub bill_ids: Vec<Uuid>,
    pub payment_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

/// Filter parameters for listing payments.
#[derive(Debug, Clone, Default)]
pub struct ListPaymentsFilter {
    pub customer_id: Option<Uuid>,
    pub bill_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
