use crate::models::{CreateCustomer, Customer, CustomerType, ListCustomersFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::SortColumns;

pub const CUSTOMER_SORT: SortColumns = &[
    ("createdUtc", "created_utc"),
    ("fullName", "full_name"),
    ("accountNumber", "account_number"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 32, message = "Account number is required"))]
    pub account_number: String,
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: CustomerType,
}

impl From<CreateCustomerRequest> for CreateCustomer {
    fn from(req: CreateCustomerRequest) -> Self {
        Self {
            account_number: req.account_number.trim().to_string(),
            full_name: req.full_name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            address: req.address,
            customer_type: req.customer_type,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListParams {
    /// Matches name or account number.
    pub search: Option<String>,
    pub customer_type: Option<CustomerType>,
}

impl From<CustomerListParams> for ListCustomersFilter {
    fn from(params: CustomerListParams) -> Self {
        Self {
            search: params.search.filter(|s| !s.trim().is_empty()),
            customer_type: params.customer_type,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
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

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            customer_id: c.customer_id,
            account_number: c.account_number,
            full_name: c.full_name,
            email: c.email,
            phone: c.phone,
            address: c.address,
            customer_type: c.customer_type,
            created_utc: c.created_utc,
            updated_utc: c.updated_utc,
        }
    }
}
