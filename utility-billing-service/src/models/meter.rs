//! Meter and meter reading models.

use super::ParseEnumError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meter {
    pub meter_id: Uuid,
    pub connection_id: Uuid,
    pub serial_number: String,
    pub meter_type: String,
    pub multiplier: Decimal,
    pub installed_on: NaiveDate,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateMeter {
    pub connection_id: Uuid,
    pub serial_number: String,
    pub meter_type: String,
    pub multiplier: Decimal,
    pub installed_on: NaiveDate,
}

/// How a reading was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingSource {
    Manual,
    Automated,
    Estimated,
}

impl ReadingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSource::Manual => "MANUAL",
            ReadingSource::Automated => "AUTOMATED",
            ReadingSource::Estimated => "ESTIMATED",
        }
    }
}

impl FromStr for ReadingSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(ReadingSource::Manual),
            "AUTOMATED" => Ok(ReadingSource::Automated),
            "ESTIMATED" => Ok(ReadingSource::Estimated),
            other => Err(ParseEnumError::new("reading source", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeterReading {
    pub reading_id: Uuid,
    pub meter_id: Uuid,
    pub reading_value: Decimal,
    pub previous_value: Decimal,
    pub consumption: Decimal,
    pub reading_date: NaiveDate,
    pub reading_source: String,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateReading {
    pub meter_id: Uuid,
    pub reading_value: Decimal,
    pub reading_date: NaiveDate,
    pub reading_source: ReadingSource,
}

impl CreateReading {
    /// Consumption since `previous`, scaled by the meter multiplier.
    /// `None` when the register went backwards.
    pub fn consumption(&self, previous: Decimal, multiplier: Decimal) -> Option<Decimal> {
        if self.reading_value < previous {
            return None;
        }
        Some((self.reading_value - previous) * multiplier)
    }
}
