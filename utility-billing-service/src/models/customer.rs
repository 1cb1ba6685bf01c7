//! Customer account model.

use super::ParseEnumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Tariff class of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerType {
    Residential,
    Commercial,
    Industrial,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Residential => "RESIDENTIAL",
            CustomerType::Commercial => "COMMERCIAL",
            CustomerType::Industrial => "INDUSTRIAL",
        }
    }
}

impl FromStr for CustomerType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESIDENTIAL" => Ok(CustomerType::Residential),
            "COMMERCIAL" => Ok(CustomerType::Commercial),
            "INDUSTRIAL" => Ok(CustomerType::Industrial),
            other => Err(ParseEnumError::new("customer type", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub customer_id: Uuid,
    pub account_number: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub account_number: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: CustomerType,
}

/// Filter parameters for listing customers.
#[derive(Debug, Clone, Default)]
pub struct ListCustomersFilter {
    /// Case-insensitive match on name or account number.
    pub search: Option<String>,
    pub customer_type: Option<CustomerType>,
}
