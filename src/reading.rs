//! Sensor readings and the feature vocabulary shared by every model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of physical measurements per reading (compile-time constant).
pub const NUM_FEATURES: usize = 4;

/// The four monitored water-quality parameters.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feature {
    Ph = 0,
    Turbidity = 1,
    DissolvedSolids = 2,
    Temperature = 3,
}

impl Feature {
    pub const ALL: [Feature; NUM_FEATURES] = [
        Feature::Ph,
        Feature::Turbidity,
        Feature::DissolvedSolids,
        Feature::Temperature,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ph => "pH",
            Self::Turbidity => "turbidity",
            Self::DissolvedSolids => "tds",
            Self::Temperature => "temperature",
        }
    }
}

/// One timestamped set of measurements from the sensor stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub ph: f64,
    pub turbidity_ntu: f64,
    pub tds_mgl: f64,
    pub temp_celsius: f64,
}

impl SensorReading {
    pub fn new(
        timestamp: DateTime<Utc>,
        ph: f64,
        turbidity_ntu: f64,
        tds_mgl: f64,
        temp_celsius: f64,
    ) -> Self {
        Self {
            timestamp,
            ph,
            turbidity_ntu,
            tds_mgl,
            temp_celsius,
        }
    }

    /// Measurements as a fixed-size vector, indexed by [`Feature`].
    pub fn features(&self) -> [f64; NUM_FEATURES] {
        [self.ph, self.turbidity_ntu, self.tds_mgl, self.temp_celsius]
    }

    pub fn feature(&self, f: Feature) -> f64 {
        self.features()[f as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_matches_vector() {
        let r = SensorReading::new(Utc::now(), 7.2, 1.5, 150.0, 22.0);
        assert_eq!(r.feature(Feature::Ph), 7.2);
        assert_eq!(r.feature(Feature::Turbidity), 1.5);
        assert_eq!(r.feature(Feature::DissolvedSolids), 150.0);
        assert_eq!(r.feature(Feature::Temperature), 22.0);
        assert_eq!(r.features(), [7.2, 1.5, 150.0, 22.0]);
    }
}
