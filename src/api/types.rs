//! Wire types for the HTTP API.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::store::{Measurement, StatsSnapshot};

/// One item of an ingest batch.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct SensorReading {
    /// Sensor name. Must not be empty.
    pub sensor: String,
    /// ISO 8601 datetime. Values without an offset are taken as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<FixedOffset>,
    /// Reading value. Numeric strings are accepted.
    #[serde(deserialize_with = "deserialize_value")]
    pub value: f64,
}

impl SensorReading {
    /// Validate and convert into a stored measurement.
    ///
    /// `index` is the item's position in its batch, used in error messages.
    pub fn into_measurement(self, index: usize) -> Result<Measurement, ApiError> {
        if self.sensor.is_empty() {
            return Err(ApiError::Validation(format!(
                "item {index}: sensor must be a non-empty string"
            )));
        }
        Ok(Measurement::new(self.sensor, self.timestamp, self.value))
    }
}

/// Validate a whole batch. Either every item converts or none do.
pub fn validate_batch(readings: Vec<SensorReading>) -> Result<Vec<Measurement>, ApiError> {
    readings
        .into_iter()
        .enumerate()
        .map(|(index, reading)| reading.into_measurement(index))
        .collect()
}

/// Parse an ISO 8601 datetime, with or without an offset.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = s.parse::<DateTime<FixedOffset>>() {
        return Some(dt);
    }
    s.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid datetime: {raw:?}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn deserialize_value<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumberOrString::deserialize(deserializer)
        .map_err(|_| <D::Error as de::Error>::custom("value must be a number"))?
    {
        NumberOrString::Number(n) => n,
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| {
                <D::Error as de::Error>::custom(format!("value is not a valid number: {s:?}"))
            })?,
    };

    if !value.is_finite() {
        return Err(de::Error::custom("value must be finite"));
    }
    Ok(value)
}

/// Statistics query response.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Timestamp of the last appended measurement, or null.
    #[serde(serialize_with = "serialize_timestamp")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_measurement: Option<DateTime<FixedOffset>>,
    /// Number of measurements.
    pub count: usize,
    /// Mean measurement value.
    pub avg: f64,
}

fn serialize_timestamp<S>(
    timestamp: &Option<DateTime<FixedOffset>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match timestamp {
        Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            last_measurement: snapshot.last_measurement_timestamp,
            count: snapshot.count,
            avg: snapshot.avg,
        }
    }
}

/// Error body returned with 4xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Human readable description.
    pub detail: String,
}
