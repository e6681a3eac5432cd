//! Input validation and run persistence.
//!
//! Readings outside hard physical limits never reach the detector. Short
//! sensor dropouts are forward-filled from the last valid observation, up to
//! a small consecutive-gap limit; anything longer is dropped. Persistence is
//! plain append-on-write JSON with no durability guarantees.

use crate::config::ValidRanges;
use crate::reading::SensorReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Persistence failure.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O failed: {}", e),
            Self::Serialization(e) => write!(f, "serialization failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Checks readings against hard physical limits.
#[derive(Debug, Clone, Copy)]
pub struct ReadingValidator {
    ranges: ValidRanges,
}

impl ReadingValidator {
    pub fn new(ranges: ValidRanges) -> Self {
        Self { ranges }
    }

    pub fn is_valid(&self, reading: &SensorReading) -> bool {
        let within = |value: f64, (lo, hi): (f64, f64)| value >= lo && value <= hi;
        within(reading.ph, self.ranges.ph)
            && within(reading.turbidity_ntu, self.ranges.turbidity_ntu)
            && within(reading.tds_mgl, self.ranges.tds_mgl)
            && within(reading.temp_celsius, self.ranges.temp_celsius)
    }
}

/// A reading as it arrives off the wire, with possibly missing measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    pub ph: Option<f64>,
    pub turbidity_ntu: Option<f64>,
    pub tds_mgl: Option<f64>,
    pub temp_celsius: Option<f64>,
}

/// Forward-fill per-feature gaps up to `limit` consecutive missing values.
/// Rows that remain incomplete afterwards are dropped.
pub fn fill_missing(records: &[RawRecord], limit: usize) -> Vec<SensorReading> {
    let mut last: [Option<f64>; 4] = [None; 4];
    let mut gap_run = [0usize; 4];
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        let raw = [
            record.ph,
            record.turbidity_ntu,
            record.tds_mgl,
            record.temp_celsius,
        ];
        let mut filled = [0.0; 4];
        let mut complete = true;

        for i in 0..4 {
            match raw[i] {
                Some(v) => {
                    last[i] = Some(v);
                    gap_run[i] = 0;
                    filled[i] = v;
                }
                None => {
                    gap_run[i] += 1;
                    match last[i] {
                        Some(v) if gap_run[i] <= limit => filled[i] = v,
                        _ => complete = false,
                    }
                }
            }
        }

        if complete {
            out.push(SensorReading::new(
                record.timestamp,
                filled[0],
                filled[1],
                filled[2],
                filled[3],
            ));
        }
    }
    out
}

/// File-backed persistence for a monitor run: a JSON-lines dataset plus
/// alert-log and metrics documents.
pub struct ReadingStore {
    dataset_path: PathBuf,
    alerts_path: PathBuf,
    metrics_path: PathBuf,
}

impl ReadingStore {
    pub fn new(data_dir: &Path) -> Result<Self, StoreError> {
        create_dir_all(data_dir)?;
        Ok(Self {
            dataset_path: data_dir.join("readings.jsonl"),
            alerts_path: data_dir.join("alerts_log.json"),
            metrics_path: data_dir.join("learning_metrics.json"),
        })
    }

    /// Append one record to the dataset file, creating it on first write.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.dataset_path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Overwrite the dataset file with the full run.
    pub fn save_dataset<T: Serialize>(&self, records: &[T]) -> Result<(), StoreError> {
        let mut file = File::create(&self.dataset_path)?;
        for record in records {
            writeln!(file, "{}", serde_json::to_string(record)?)?;
        }
        info!(path = %self.dataset_path.display(), count = records.len(), "dataset saved");
        Ok(())
    }

    pub fn save_alerts<T: Serialize>(&self, alerts: &[T]) -> Result<(), StoreError> {
        let file = File::create(&self.alerts_path)?;
        serde_json::to_writer_pretty(file, alerts)?;
        info!(path = %self.alerts_path.display(), count = alerts.len(), "alert log saved");
        Ok(())
    }

    pub fn save_metrics<T: Serialize>(&self, metrics: &T) -> Result<(), StoreError> {
        let file = File::create(&self.metrics_path)?;
        serde_json::to_writer_pretty(file, metrics)?;
        info!(path = %self.metrics_path.display(), "learning metrics saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(ph: f64) -> SensorReading {
        SensorReading::new(Utc::now(), ph, 1.5, 150.0, 22.0)
    }

    #[test]
    fn test_validator_accepts_in_range() {
        let v = ReadingValidator::new(ValidRanges::default());
        assert!(v.is_valid(&reading(7.2)));
    }

    #[test]
    fn test_validator_rejects_out_of_range() {
        let v = ReadingValidator::new(ValidRanges::default());
        assert!(!v.is_valid(&reading(15.0)));
        assert!(!v.is_valid(&SensorReading::new(Utc::now(), 7.0, -1.0, 150.0, 22.0)));
        assert!(!v.is_valid(&SensorReading::new(Utc::now(), 7.0, 1.5, 2500.0, 22.0)));
        assert!(!v.is_valid(&SensorReading::new(Utc::now(), 7.0, 1.5, 150.0, 60.0)));
    }

    fn raw(ph: Option<f64>) -> RawRecord {
        RawRecord {
            timestamp: Utc::now(),
            ph,
            turbidity_ntu: Some(1.5),
            tds_mgl: Some(150.0),
            temp_celsius: Some(22.0),
        }
    }

    #[test]
    fn test_fill_missing_bridges_short_gaps() {
        let records = vec![raw(Some(7.0)), raw(None), raw(Some(7.2))];
        let filled = fill_missing(&records, 3);
        assert_eq!(filled.len(), 3);
        assert_eq!(filled[1].ph, 7.0);
    }

    #[test]
    fn test_fill_missing_drops_long_gaps() {
        let mut records = vec![raw(Some(7.0))];
        records.extend((0..4).map(|_| raw(None)));
        let filled = fill_missing(&records, 3);
        // Three fills allowed, the fourth consecutive gap is dropped.
        assert_eq!(filled.len(), 4);
    }

    #[test]
    fn test_fill_missing_drops_leading_gap() {
        let records = vec![raw(None), raw(Some(7.2))];
        let filled = fill_missing(&records, 3);
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].ph, 7.2);
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = std::env::temp_dir().join("aquaguard_store_test");
        let store = ReadingStore::new(&dir).unwrap();

        store.save_dataset(&[reading(7.0), reading(7.1)]).unwrap();
        store.append(&reading(7.2)).unwrap();

        let content = std::fs::read_to_string(dir.join("readings.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 3);

        store.save_metrics(&serde_json::json!({"final_sensitivity": 0.05})).unwrap();
        assert!(dir.join("learning_metrics.json").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
