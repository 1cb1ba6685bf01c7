//! Prometheus metrics for utility-billing-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Histogram for database query duration by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "utility_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for cashier payments by method and outcome.
pub static PAYMENTS_RECORDED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "utility_payments_recorded_total",
        "Total number of cashier payments",
        &["method", "status"]
    )
    .expect("Failed to register PAYMENTS_RECORDED")
});

/// Allocated currency by payment method.
pub static PAYMENT_AMOUNT: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "utility_payment_amount_total",
        "Total amount allocated to bills",
        &["method"]
    )
    .expect("Failed to register PAYMENT_AMOUNT")
});

/// Counter for lifecycle transitions by entity and target status.
pub static STATUS_TRANSITIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "utility_status_transitions_total",
        "Total number of status transitions",
        &["entity", "to"]
    )
    .expect("Failed to register STATUS_TRANSITIONS")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "utility_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&PAYMENTS_RECORDED);
    Lazy::force(&PAYMENT_AMOUNT);
    Lazy::force(&STATUS_TRANSITIONS);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Record a cashier payment outcome.
pub fn record_payment(method: &str, status: &str) {
    PAYMENTS_RECORDED.with_label_values(&[method, status]).inc();
}

/// Record currency allocated to bills.
pub fn record_payment_amount(method: &str, amount: f64) {
    PAYMENT_AMOUNT.with_label_values(&[method]).inc_by(amount);
}

/// Record a status transition.
pub fn record_transition(entity: &str, to: &str) {
    STATUS_TRANSITIONS.with_label_values(&[entity, to]).inc();
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
