//! In-memory measurement log.
//!
//! The store is an append-only sequence of [`Measurement`] records. The only
//! way records leave it is bulk removal by sensor name. Every query is a linear
//! scan; insertion order is what defines the "last" measurement.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Name of the sensor that produced the reading.
    pub sensor_name: String,
    /// When the reading was taken, with the offset it was submitted in.
    pub timestamp: DateTime<FixedOffset>,
    /// Measured value.
    pub value: f64,
}

impl Measurement {
    /// Create a new measurement.
    pub fn new(sensor_name: impl Into<String>, timestamp: DateTime<FixedOffset>, value: f64) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            timestamp,
            value,
        }
    }
}

/// Aggregates reported by the statistics endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    /// Timestamp of the last appended record in scope.
    pub last_measurement_timestamp: Option<DateTime<FixedOffset>>,
    /// Number of records in scope.
    pub count: usize,
    /// Mean value of records in scope, 0.0 when there are none.
    pub avg: f64,
}

impl StatsSnapshot {
    /// Snapshot of an empty scope.
    pub const EMPTY: Self = Self {
        last_measurement_timestamp: None,
        count: 0,
        avg: 0.0,
    };
}

/// Which records a statistics query aggregates over.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatsScope {
    /// Every record in the store, regardless of the requested sensor.
    #[default]
    Store,
    /// Only records whose sensor name matches the requested sensor.
    Sensor,
}

/// Ordered, append-only log of measurements.
#[derive(Debug, Default)]
pub struct MeasurementStore {
    records: Vec<Measurement>,
}

impl MeasurementStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to the end of the log, preserving their order.
    pub fn append(&mut self, records: impl IntoIterator<Item = Measurement>) {
        self.records.extend(records);
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Measurement] {
        &self.records
    }

    /// Sum of every stored value.
    pub fn total_value(&self) -> f64 {
        self.records.iter().map(|m| m.value).sum()
    }

    /// Remove every record for `name`, keeping the rest in order.
    ///
    /// Returns how many records were removed. Unknown sensors are a no-op.
    pub fn remove_by_sensor(&mut self, name: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|m| m.sensor_name != name);
        before - self.records.len()
    }

    /// Store-wide aggregates.
    ///
    /// `last_measurement_timestamp` belongs to the last appended record
    /// overall, not the one with the latest timestamp.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        snapshot_of(self.records.iter())
    }

    /// Aggregates over the records of a single sensor.
    pub fn sensor_snapshot(&self, name: &str) -> StatsSnapshot {
        snapshot_of(self.records.iter().filter(|m| m.sensor_name == name))
    }

    /// Aggregates for `sensor` under the given scope.
    pub fn snapshot_for(&self, scope: StatsScope, sensor: &str) -> StatsSnapshot {
        match scope {
            StatsScope::Store => self.stats_snapshot(),
            StatsScope::Sensor => self.sensor_snapshot(sensor),
        }
    }
}

/// Aggregate a scan of records.
///
/// Each value is divided by the count before summing, so the mean stays
/// finite even when the plain sum of finite values would overflow.
fn snapshot_of<'a, I>(records: I) -> StatsSnapshot
where
    I: Iterator<Item = &'a Measurement> + Clone,
{
    let count = records.clone().count();
    let Some(last) = records.clone().last() else {
        return StatsSnapshot::EMPTY;
    };

    let n = count as f64;
    StatsSnapshot {
        last_measurement_timestamp: Some(last.timestamp),
        count,
        avg: records.map(|m| m.value / n).sum(),
    }
}
