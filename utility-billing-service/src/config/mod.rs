//! Configuration module for utility-billing-service.

use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct UtilityBillingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub reconciliation: ReconciliationPolicyConfig,
    pub receipt_prefix: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret; `None` leaves the API unguarded.
    pub jwt_secret: Option<Secret<String>>,
}

/// Default variance limits for collection reconciliation, in percent.
#[derive(Debug, Clone)]
pub struct ReconciliationPolicyConfig {
    pub threshold_percent: Decimal,
    pub review_band_percent: Decimal,
}

impl Default for ReconciliationPolicyConfig {
    fn default() -> Self {
        Self {
            threshold_percent: Decimal::new(2, 0),
            review_band_percent: Decimal::new(5, 0),
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Result<Decimal, AppError> {
    match env::var(key) {
        Ok(raw) => Decimal::from_str(raw.trim()).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} is not a decimal: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}

impl UtilityBillingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let defaults = ReconciliationPolicyConfig::default();
        let reconciliation = ReconciliationPolicyConfig {
            threshold_percent: env_decimal(
                "RECONCILIATION_THRESHOLD_PERCENT",
                defaults.threshold_percent,
            )?,
            review_band_percent: env_decimal(
                "RECONCILIATION_REVIEW_BAND_PERCENT",
                defaults.review_band_percent,
            )?,
        };
        if reconciliation.review_band_percent < reconciliation.threshold_percent {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RECONCILIATION_REVIEW_BAND_PERCENT must not be below RECONCILIATION_THRESHOLD_PERCENT"
            )));
        }

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "utility-billing-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            auth: AuthConfig {
                jwt_secret: env::var("AUTH_JWT_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .map(Secret::new),
            },
            reconciliation,
            receipt_prefix: env::var("RECEIPT_PREFIX").unwrap_or_else(|_| "RCP".to_string()),
        })
    }
}
