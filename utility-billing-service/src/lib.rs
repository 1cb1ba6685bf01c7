//! Utility billing back office: bills, cashier payments spread over several
//! bills, collection reconciliation, and the complaint, work order and
//! service connection lifecycles.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::AppState;
