use crate::models::{CreateMeter, CreateReading, Meter, MeterReading, ReadingSource};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{non_negative, positive, SortColumns};

pub const METER_SORT: SortColumns = &[
    ("createdUtc", "created_utc"),
    ("serialNumber", "serial_number"),
    ("installedOn", "installed_on"),
];

pub const READING_SORT: SortColumns = &[
    ("readingDate", "reading_date"),
    ("createdUtc", "created_utc"),
    ("consumption", "consumption"),
];

fn default_multiplier() -> Decimal {
    Decimal::ONE
}

fn default_reading_source() -> ReadingSource {
    ReadingSource::Manual
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeterRequest {
    pub connection_id: Uuid,
    #[validate(length(min = 1, max = 64, message = "Serial number is required"))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 32, message = "Meter type is required"))]
    pub meter_type: String,
    #[serde(default = "default_multiplier")]
    #[validate(custom(function = "positive"))]
    pub multiplier: Decimal,
    pub installed_on: NaiveDate,
}

impl From<CreateMeterRequest> for CreateMeter {
    fn from(req: CreateMeterRequest) -> Self {
        Self {
            connection_id: req.connection_id,
            serial_number: req.serial_number,
            meter_type: req.meter_type,
            multiplier: req.multiplier,
            installed_on: req.installed_on,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterListParams {
    pub connection_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    #[validate(custom(function = "non_negative"))]
    pub reading_value: Decimal,
    pub reading_date: NaiveDate,
    #[serde(default = "default_reading_source")]
    pub reading_source: ReadingSource,
}

impl CreateReadingRequest {
    pub fn into_input(self, meter_id: Uuid) -> CreateReading {
        CreateReading {
            meter_id,
            reading_value: self.reading_value,
            reading_date: self.reading_date,
            reading_source: self.reading_source,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterResponse {
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

impl From<Meter> for MeterResponse {
    fn from(m: Meter) -> Self {
        Self {
            meter_id: m.meter_id,
            connection_id: m.connection_id,
            serial_number: m.serial_number,
            meter_type: m.meter_type,
            multiplier: m.multiplier,
            installed_on: m.installed_on,
            is_active: m.is_active,
            created_utc: m.created_utc,
            updated_utc: m.updated_utc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingResponse {
    pub reading_id: Uuid,
    pub meter_id: Uuid,
    pub reading_value: Decimal,
    pub previous_value: Decimal,
    pub consumption: Decimal,
    pub reading_date: NaiveDate,
    pub reading_source: String,
    pub created_utc: DateTime<Utc>,
}

impl From<MeterReading> for ReadingResponse {
    fn from(r: MeterReading) -> Self {
        Self {
            reading_id: r.reading_id,
            meter_id: r.meter_id,
            reading_value: r.reading_value,
            previous_value: r.previous_value,
            consumption: r.consumption,
            reading_date: r.reading_date,
            reading_source: r.reading_source,
            created_utc: r.created_utc,
        }
    }
}
