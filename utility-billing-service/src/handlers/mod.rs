pub mod bills;
pub mod complaints;
pub mod connections;
pub mod customers;
pub mod extract;
pub mod health;
pub mod meters;
pub mod payments;
pub mod work_orders;

pub use health::{health_check, metrics_handler, readiness_check};
