//! Services module for utility-billing-service.

pub mod allocator;
pub mod calculator;
pub mod costing;
pub mod database;
pub mod metrics;
pub mod reconciliation;

pub use database::{Database, RecordedPayment};
pub use metrics::{
    get_metrics, init_metrics, record_error, record_payment, record_payment_amount,
    record_transition,
};
