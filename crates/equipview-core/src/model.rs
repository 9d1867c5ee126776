//! Core data types for equipment readings and datasets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::aggregate::aggregate;
use crate::field::Field;

/// One equipment reading.
///
/// Rows are produced by [`normalize`](crate::normalize::normalize). The only
/// other way to obtain one is deserializing a stored row, which re-checks that
/// every numeric field is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RowFields")]
pub struct Row {
    equipment_name: String,
    #[serde(rename = "type")]
    kind: String,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
}

impl Row {
    /// Caller guarantees the three readings are finite.
    pub(crate) fn from_validated(
        equipment_name: String,
        kind: String,
        flowrate: f64,
        pressure: f64,
        temperature: f64,
    ) -> Self {
        Self {
            equipment_name,
            kind,
            flowrate,
            pressure,
            temperature,
        }
    }

    /// Equipment name, verbatim from the source cell.
    pub fn equipment_name(&self) -> &str {
        &self.equipment_name
    }

    /// Category label, verbatim from the source cell.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Flow rate.
    pub fn flowrate(&self) -> f64 {
        self.flowrate
    }

    /// Pressure.
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

/// A stored row had a NaN or infinite reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} must be a finite number")]
pub struct NonFiniteValue(pub Field);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RowFields {
    equipment_name: String,
    #[serde(rename = "type")]
    kind: String,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
}

impl TryFrom<RowFields> for Row {
    type Error = NonFiniteValue;

    fn try_from(fields: RowFields) -> Result<Self, Self::Error> {
        for (field, value) in [
            (Field::Flowrate, fields.flowrate),
            (Field::Pressure, fields.pressure),
            (Field::Temperature, fields.temperature),
        ] {
            if !value.is_finite() {
                return Err(NonFiniteValue(field));
            }
        }
        Ok(Row::from_validated(
            fields.equipment_name,
            fields.kind,
            fields.flowrate,
            fields.pressure,
            fields.temperature,
        ))
    }
}

/// Summary statistics over a set of rows.
///
/// Always derived from rows by [`aggregate`]; the `Default` value is the
/// aggregate of zero rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of rows.
    pub total_equipment: u64,
    /// Mean flow rate, 0 when there are no rows.
    pub avg_flowrate: f64,
    /// Mean pressure, 0 when there are no rows.
    pub avg_pressure: f64,
    /// Mean temperature, 0 when there are no rows.
    pub avg_temperature: f64,
    /// Occurrences of each exact `type` value.
    pub type_distribution: BTreeMap<String, u64>,
}

/// One upload: its rows, their statistics and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRecord {
    /// Store-assigned identifier, never reused.
    pub id: i64,
    /// Arrival time assigned by the store.
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    /// Filename as supplied by the uploader.
    pub filename: String,
    /// Statistics snapshot.
    pub stats: Stats,
    /// Rows in source file order.
    pub rows: Vec<Row>,
}

impl DatasetRecord {
    /// Metadata-only view of this record.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id,
            filename: self.filename.clone(),
            uploaded_at: self.uploaded_at,
        }
    }

    /// Replace the statistics snapshot, returning the new record.
    pub fn with_stats(self, stats: Stats) -> Self {
        Self { stats, ..self }
    }

    /// Recompute statistics from the record's own rows.
    pub fn refreshed(self) -> Self {
        let stats = aggregate(&self.rows);
        self.with_stats(stats)
    }
}

/// Listing entry for a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: i64,
    pub filename: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump() -> Row {
        Row::from_validated("Pump A1".into(), "Pump".into(), 150.5, 8.2, 45.0)
    }

    #[test]
    fn test_row_json_uses_canonical_names() {
        let json = serde_json::to_value(pump()).unwrap();
        assert_eq!(json["equipmentName"], "Pump A1");
        assert_eq!(json["type"], "Pump");
        assert_eq!(json["flowrate"], 150.5);
        assert_eq!(json["pressure"], 8.2);
        assert_eq!(json["temperature"], 45.0);
    }

    #[test]
    fn test_row_deserialize_revalidates() {
        let json = r#"{"equipmentName":"X","type":"Pump","flowrate":1e999,"pressure":1,"temperature":1}"#;
        assert!(serde_json::from_str::<Row>(json).is_err());

        let json = r#"{"equipmentName":"X","type":"Pump","flowrate":1.5,"pressure":1,"temperature":1}"#;
        let row: Row = serde_json::from_str(json).unwrap();
        assert_eq!(row.flowrate(), 1.5);
    }

    #[test]
    fn test_refreshed_replaces_stale_stats() {
        let record = DatasetRecord {
            id: 7,
            uploaded_at: OffsetDateTime::UNIX_EPOCH,
            filename: "plant.csv".into(),
            stats: Stats::default(),
            rows: vec![pump(), pump()],
        };

        let refreshed = record.clone().refreshed();
        assert_eq!(refreshed.stats.total_equipment, 2);
        assert_eq!(refreshed.stats.avg_flowrate, 150.5);
        assert_eq!(refreshed.rows, record.rows);
        assert_eq!(refreshed.uploaded_at, record.uploaded_at);
    }

    #[test]
    fn test_record_json_shape() {
        let record = DatasetRecord {
            id: 1,
            uploaded_at: OffsetDateTime::UNIX_EPOCH,
            filename: "a.csv".into(),
            stats: Stats::default(),
            rows: Vec::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["uploadedAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["stats"]["totalEquipment"], 0);
        assert!(json["stats"]["typeDistribution"].as_object().unwrap().is_empty());

        let summary = serde_json::to_value(record.summary()).unwrap();
        assert_eq!(summary["id"], 1);
        assert_eq!(summary["filename"], "a.csv");
        assert!(summary.get("rows").is_none());
    }
}
