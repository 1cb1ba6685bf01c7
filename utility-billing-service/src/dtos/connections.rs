use crate::models::{
    ConnectionStatus, CreateConnection, ListConnectionsFilter, ServiceConnection, UtilityType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::SortColumns;

pub const CONNECTION_SORT: SortColumns = &[
    ("createdUtc", "created_utc"),
    ("status", "status"),
    ("activatedUtc", "activated_utc"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub customer_id: Uuid,
    pub utility_type: UtilityType,
    #[validate(length(min = 1, max = 32, message = "Tariff code is required"))]
    pub tariff_code: String,
    #[validate(length(min = 1, message = "Service address is required"))]
    pub service_address: String,
}

impl From<CreateConnectionRequest> for CreateConnection {
    fn from(req: CreateConnectionRequest) -> Self {
        Self {
            customer_id: req.customer_id,
            utility_type: req.utility_type,
            tariff_code: req.tariff_code,
            service_address: req.service_address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionListParams {
    pub customer_id: Option<Uuid>,
    pub status: Option<ConnectionStatus>,
    pub utility_type: Option<UtilityType>,
}

impl From<ConnectionListParams> for ListConnectionsFilter {
    fn from(params: ConnectionListParams) -> Self {
        Self {
            customer_id: params.customer_id,
            status: params.status,
            utility_type: params.utility_type,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub connection_id: Uuid,
    pub customer_id: Uuid,
    pub utility_type: String,
    pub tariff_code: String,
    pub service_address: String,
    pub status: String,
    pub activated_utc: Option<DateTime<Utc>>,
    pub disconnected_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<ServiceConnection> for ConnectionResponse {
    fn from(c: ServiceConnection) -> Self {
        Self {
            connection_id: c.connection_id,
            customer_id: c.customer_id,
            utility_type: c.utility_type,
            tariff_code: c.tariff_code,
            service_address: c.service_address,
            status: c.status,
            activated_utc: c.activated_utc,
            disconnected_utc: c.disconnected_utc,
            created_utc: c.created_utc,
            updated_utc: c.updated_utc,
        }
    }
}
