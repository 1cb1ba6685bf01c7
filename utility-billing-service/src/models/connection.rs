//! Service connection model and its lifecycle.

use super::{ParseEnumError, TransitionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilityType {
    Electricity,
    Water,
    Gas,
}

impl UtilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityType::Electricity => "ELECTRICITY",
            UtilityType::Water => "WATER",
            UtilityType::Gas => "GAS",
        }
    }
}

impl FromStr for UtilityType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ELECTRICITY" => Ok(UtilityType::Electricity),
            "WATER" => Ok(UtilityType::Water),
            "GAS" => Ok(UtilityType::Gas),
            other => Err(ParseEnumError::new("utility type", other)),
        }
    }
}

/// Connection status. DISCONNECTED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Active,
    Suspended,
    Disconnected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "PENDING",
            ConnectionStatus::Active => "ACTIVE",
            ConnectionStatus::Suspended => "SUSPENDED",
            ConnectionStatus::Disconnected => "DISCONNECTED",
        }
    }

    /// Resolve `action` against the transition table.
    pub fn apply(self, action: ConnectionAction) -> Result<ConnectionStatus, TransitionError> {
        use ConnectionAction as A;
        use ConnectionStatus as S;

        let next = match (self, action) {
            (S::Pending, A::Activate) => S::Active,
            (S::Active, A::Suspend) => S::Suspended,
            (S::Suspended, A::Reconnect) => S::Active,
            (S::Pending | S::Active | S::Suspended, A::Disconnect) => S::Disconnected,
            (from, action) => {
                return Err(TransitionError::Invalid {
                    entity: "connection",
                    from: from.as_str(),
                    action: action.as_str(),
                })
            }
        };
        Ok(next)
    }
}

impl FromStr for ConnectionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ConnectionStatus::Pending),
            "ACTIVE" => Ok(ConnectionStatus::Active),
            "SUSPENDED" => Ok(ConnectionStatus::Suspended),
            "DISCONNECTED" => Ok(ConnectionStatus::Disconnected),
            other => Err(ParseEnumError::new("connection status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    Activate,
    Suspend,
    Reconnect,
    Disconnect,
}

impl ConnectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionAction::Activate => "activate",
            ConnectionAction::Suspend => "suspend",
            ConnectionAction::Reconnect => "reconnect",
            ConnectionAction::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceConnection {
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

#[derive(Debug, Clone)]
pub struct CreateConnection {
    pub customer_id: Uuid,
    pub utility_type: UtilityType,
    pub tariff_code: String,
    pub service_address: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListConnectionsFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<ConnectionStatus>,
    pub utility_type: Option<UtilityType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_happy_path() {
        let status = ConnectionStatus::Pending
            .apply(ConnectionAction::Activate)
            .unwrap();
        assert_eq!(status, ConnectionStatus::Active);

        let status = status.apply(ConnectionAction::Suspend).unwrap();
        assert_eq!(status, ConnectionStatus::Suspended);

        let status = status.apply(ConnectionAction::Reconnect).unwrap();
        assert_eq!(status, ConnectionStatus::Active);

        let status = status.apply(ConnectionAction::Disconnect).unwrap();
        assert_eq!(status, ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_disconnected_is_terminal() {
        for action in [
            ConnectionAction::Activate,
            ConnectionAction::Suspend,
            ConnectionAction::Reconnect,
            ConnectionAction::Disconnect,
        ] {
            assert!(ConnectionStatus::Disconnected.apply(action).is_err());
        }
    }

    #[test]
    fn test_cannot_reconnect_active_connection() {
        let err = ConnectionStatus::Active
            .apply(ConnectionAction::Reconnect)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid connection transition: cannot reconnect when status is ACTIVE"
        );
    }
}
