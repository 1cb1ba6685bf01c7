//! Request and response types for the REST API.

mod common;

pub mod bills;
pub mod complaints;
pub mod connections;
pub mod customers;
pub mod meters;
pub mod payments;
pub mod work_orders;

pub(crate) use common::validation_error;
pub use common::{
    non_negative, non_negative_amount, positive, positive_amount, ApiResponse, ListQuery,
    ListResponse, PageMeta, SortColumns, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, MONEY_SCALE,
};
