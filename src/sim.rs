//! Synthetic sensor stream with controlled anomaly injection.
//!
//! Generates realistic water-quality readings with diurnal effects and
//! Gaussian sensor noise, and can inject three contamination event types.
//! Every generated record carries a ground-truth label so downstream
//! feedback can be simulated against what was actually injected.

use crate::config::Baselines;
use crate::reading::SensorReading;
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Contamination event types the simulator can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Alkaline discharge: pH spikes high, everything else stays normal.
    ChemicalSpill,
    /// High turbidity and dissolved solids.
    SewageDischarge,
    /// Acidic runoff with a temperature rise.
    IndustrialWaste,
}

impl AnomalyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChemicalSpill => "chemical_spill",
            Self::SewageDischarge => "sewage_discharge",
            Self::IndustrialWaste => "industrial_waste",
        }
    }
}

/// A generated reading together with its ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledReading {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub is_anomaly: bool,
}

/// Seeded generator of synthetic sensor readings.
pub struct SensorSimulator {
    baselines: Baselines,
    rng: StdRng,
}

impl SensorSimulator {
    pub fn new(baselines: Baselines, seed: u64) -> Self {
        Self {
            baselines,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn round(value: f64, decimals: i32) -> f64 {
        let factor = 10f64.powi(decimals);
        (value * factor).round() / factor
    }

    fn reading_at_hour(&mut self, timestamp: DateTime<Utc>, hour: u32) -> SensorReading {
        let ph_noise = Normal::new(0.0, 0.05).unwrap().sample(&mut self.rng);
        // Photosynthesis pushes pH slightly up through the day.
        let ph_variation = if (10..=16).contains(&hour) { 0.1 } else { 0.0 };
        let ph = self.rng.random_range(self.baselines.ph.0..self.baselines.ph.1)
            + ph_variation
            + ph_noise;

        let turb_noise = Normal::new(0.0, 0.1).unwrap().sample(&mut self.rng);
        let turb = self
            .rng
            .random_range(self.baselines.turbidity_ntu.0..self.baselines.turbidity_ntu.1)
            + turb_noise;

        let tds_noise = Normal::new(0.0, 5.0).unwrap().sample(&mut self.rng);
        let tds = self
            .rng
            .random_range(self.baselines.tds_mgl.0..self.baselines.tds_mgl.1)
            + tds_noise;

        let temp_variation = if (6..=18).contains(&hour) {
            2.0 * ((hour as f64 - 6.0) * std::f64::consts::PI / 12.0).sin()
        } else {
            0.0
        };
        let temp = self
            .rng
            .random_range(self.baselines.temp_celsius.0..self.baselines.temp_celsius.1)
            + temp_variation
            + Normal::new(0.0, 0.2).unwrap().sample(&mut self.rng);

        SensorReading::new(
            timestamp,
            Self::round(ph, 2),
            Self::round(turb.max(0.0), 2),
            Self::round(tds.max(0.0), 1),
            Self::round(temp, 1),
        )
    }

    /// One normal reading with time-of-day effects taken from the timestamp.
    pub fn normal_reading(&mut self, timestamp: DateTime<Utc>) -> SensorReading {
        let hour = timestamp.hour();
        self.reading_at_hour(timestamp, hour)
    }

    /// One anomalous reading of the given kind, built on a midday baseline.
    pub fn inject(&mut self, kind: AnomalyKind, timestamp: DateTime<Utc>) -> SensorReading {
        let mut reading = self.reading_at_hour(timestamp, 12);
        match kind {
            AnomalyKind::ChemicalSpill => {
                reading.ph += self.rng.random_range(2.0..4.0);
            }
            AnomalyKind::SewageDischarge => {
                reading.turbidity_ntu += self.rng.random_range(10.0..50.0);
                reading.tds_mgl += self.rng.random_range(200.0..500.0);
            }
            AnomalyKind::IndustrialWaste => {
                reading.ph -= self.rng.random_range(2.0..3.0);
                reading.temp_celsius += self.rng.random_range(5.0..10.0);
            }
        }
        reading
    }

    /// Complete time-series dataset, one reading per minute ending now.
    ///
    /// Datasets larger than 800 readings get two injected anomalies at
    /// random positions past index 800 (one chemical spill, one sewage
    /// discharge), so the leading stretch stays clean for training. Every
    /// record carries its ground-truth label.
    pub fn generate_dataset(&mut self, num_readings: usize) -> Vec<LabeledReading> {
        let start = Utc::now() - Duration::minutes(num_readings as i64);

        let anomaly_indices = if num_readings > 800 {
            let mut first = self.rng.random_range(800..num_readings);
            let mut second = self.rng.random_range(800..num_readings);
            while second == first {
                second = self.rng.random_range(800..num_readings);
            }
            if first > second {
                std::mem::swap(&mut first, &mut second);
            }
            vec![first, second]
        } else {
            Vec::new()
        };

        (0..num_readings)
            .map(|i| {
                let timestamp = start + Duration::minutes(i as i64);
                if anomaly_indices.first() == Some(&i) {
                    LabeledReading {
                        reading: self.inject(AnomalyKind::ChemicalSpill, timestamp),
                        is_anomaly: true,
                    }
                } else if anomaly_indices.get(1) == Some(&i) {
                    LabeledReading {
                        reading: self.inject(AnomalyKind::SewageDischarge, timestamp),
                        is_anomaly: true,
                    }
                } else {
                    LabeledReading {
                        reading: self.normal_reading(timestamp),
                        is_anomaly: false,
                    }
                }
            })
            .collect()
    }
}
