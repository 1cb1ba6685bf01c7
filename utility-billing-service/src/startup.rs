//! Application startup and lifecycle management.

use crate::config::UtilityBillingConfig;
use crate::handlers::{
    self, bills, complaints, connections, customers, meters, payments, work_orders,
};
use crate::services::reconciliation::ReconciliationPolicy;
use crate::services::{init_metrics, Database};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::auth::{jwt_auth_middleware, JwtVerifier};
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::{request_id_middleware, request_id_of};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: UtilityBillingConfig,
    pub db: Arc<Database>,
    /// Default variance limits for reconciliation requests.
    pub policy: ReconciliationPolicy,
}

impl AppState {
    pub fn new(config: UtilityBillingConfig, db: Arc<Database>) -> Self {
        let policy = ReconciliationPolicy {
            threshold_percent: config.reconciliation.threshold_percent,
            review_band_percent: config.reconciliation.review_band_percent,
        };
        Self { config, db, policy }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Customers and connections
        .route(
            "/customers",
            post(customers::create_customer).get(customers::list_customers),
        )
        .route("/customers/:id", get(customers::get_customer))
        .route(
            "/connections",
            post(connections::create_connection).get(connections::list_connections),
        )
        .route("/connections/:id", get(connections::get_connection))
        .route(
            "/connections/:id/activate",
            patch(connections::activate_connection),
        )
        .route(
            "/connections/:id/suspend",
            patch(connections::suspend_connection),
        )
        .route(
            "/connections/:id/reconnect",
            patch(connections::reconnect_connection),
        )
        .route(
            "/connections/:id/disconnect",
            patch(connections::disconnect_connection),
        )
        // Meters
        .route("/meters", post(meters::create_meter).get(meters::list_meters))
        .route("/meters/:id", get(meters::get_meter))
        .route(
            "/meters/:id/readings",
            post(meters::record_reading).get(meters::list_readings),
        )
        // Bills
        .route("/bills", post(bills::create_bill).get(bills::list_bills))
        .route("/bills/summary", get(bills::bill_summary))
        .route("/bills/overdue", get(bills::list_overdue_bills))
        .route("/bills/mark-overdue", post(bills::mark_overdue))
        .route("/bills/:id", get(bills::get_bill))
        .route("/bills/:id/void", patch(bills::void_bill))
        // Payments
        .route(
            "/payments/cashier/record-payment",
            post(payments::record_cashier_payment),
        )
        .route(
            "/payments/cashier/daily-collections",
            get(payments::daily_collections),
        )
        .route(
            "/payments/reconciliation",
            post(payments::reconcile_collections),
        )
        .route("/payments", get(payments::list_payments))
        // Complaints
        .route(
            "/complaints",
            post(complaints::create_complaint).get(complaints::list_complaints),
        )
        .route("/complaints/:id", get(complaints::get_complaint))
        .route(
            "/complaints/:id/assign",
            patch(complaints::assign_complaint),
        )
        .route("/complaints/:id/start", patch(complaints::start_complaint))
        .route(
            "/complaints/:id/resolve",
            patch(complaints::resolve_complaint),
        )
        .route("/complaints/:id/close", patch(complaints::close_complaint))
        // Work orders
        .route(
            "/work-orders",
            post(work_orders::create_work_order).get(work_orders::list_work_orders),
        )
        .route("/work-orders/statistics", get(work_orders::work_order_stats))
        .route("/work-orders/:id", get(work_orders::get_work_order))
        .route(
            "/work-orders/:id/status",
            patch(work_orders::update_work_order_status),
        )
        .route(
            "/work-orders/:id/complete",
            post(work_orders::complete_work_order),
        )
        .route(
            "/work-orders/:id/cancel",
            post(work_orders::cancel_work_order),
        )
        .route("/work-orders/:id/labor", post(work_orders::add_labor))
        .route("/work-orders/:id/items", post(work_orders::add_item_usage))
}

/// Full HTTP surface: health endpoints at the root, the API under `/api/v1`.
///
/// The API is guarded by the JWT middleware only when a secret is configured.
pub fn build_router(state: AppState) -> Router {
    let mut api = api_routes();
    if let Some(secret) = &state.config.auth.jwt_secret {
        let verifier = JwtVerifier::new(secret.expose_secret().as_bytes());
        api = api.route_layer(from_fn_with_state(verifier, jwt_auth_middleware));
    } else {
        tracing::warn!("AUTH_JWT_SECRET not set - API routes are unauthenticated");
    }

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1", api)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id_of(request),
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect, migrate and bind the listener.
    pub async fn build(config: UtilityBillingConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Utility billing listener bound");

        Ok(Self {
            http_port,
            listener,
            state: AppState::new(config, Arc::new(db)),
        })
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        let router = build_router(self.state);
        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
