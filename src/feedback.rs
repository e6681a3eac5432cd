//! Feedback-driven sensitivity adaptation.
//!
//! Operators label past alerts as true or false positives. The controller
//! accumulates those labels and, every full batch, re-tunes the detector's
//! expected-anomaly fraction: too many false positives shrink it, almost
//! none widen it. The log is cleared after every evaluation (batch-and-reset,
//! not a sliding window) so one batch can never drive repeated adjustments.

use crate::config::ControllerConfig;
use crate::detect::{AnomalyDetector, Detection, DetectorError};
use crate::reading::SensorReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Operator verdict on a past alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackLabel {
    TruePositive,
    FalsePositive,
}

/// One labeled verdict, appended to the controller's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub alert_id: u64,
    pub label: FeedbackLabel,
    pub timestamp: DateTime<Utc>,
}

/// Closes the loop between operator feedback and detector sensitivity.
///
/// Owns the detector outright and is its sole sensitivity mutator. All
/// detection traffic flows through [`detect`](Self::detect).
pub struct SensitivityController {
    config: ControllerConfig,
    detector: AnomalyDetector,
    log: Vec<FeedbackRecord>,
    sensitivity: f64,
}

impl SensitivityController {
    pub fn new(detector: AnomalyDetector, config: ControllerConfig) -> Self {
        let sensitivity = detector.current_sensitivity();
        Self {
            config,
            detector,
            log: Vec::new(),
            sensitivity,
        }
    }

    /// Current sensitivity, always within the configured bounds once the
    /// controller has made any adjustment.
    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Records accumulated since the last evaluation reset.
    pub fn feedback_count(&self) -> usize {
        self.log.len()
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn train(&mut self, readings: &[SensorReading]) -> Result<(), DetectorError> {
        self.detector.train(readings)
    }

    pub fn detect(&self, reading: &SensorReading, history: &[SensorReading]) -> Detection {
        self.detector.detect(reading, history)
    }

    /// Append one labeled verdict. When the log reaches the batch size the
    /// false-positive rate is evaluated, sensitivity is adjusted and pushed
    /// to the detector, and the entire log is cleared.
    pub fn record_feedback(
        &mut self,
        alert_id: u64,
        label: FeedbackLabel,
        timestamp: DateTime<Utc>,
    ) {
        debug!(alert_id, ?label, "feedback received");
        self.log.push(FeedbackRecord {
            alert_id,
            label,
            timestamp,
        });

        if self.log.len() >= self.config.batch_size {
            self.evaluate_and_adjust();
            self.log.clear();
        }
    }

    fn evaluate_and_adjust(&mut self) {
        let batch = &self.log[self.log.len() - self.config.batch_size..];
        let fp_count = batch
            .iter()
            .filter(|r| r.label == FeedbackLabel::FalsePositive)
            .count();
        let fp_rate = fp_count as f64 / self.config.batch_size as f64;

        let adjustment = if fp_rate > self.config.fp_rate_high {
            // Over-triggering: shrink the expected-anomaly fraction.
            -self.config.step
        } else if fp_rate < self.config.fp_rate_low {
            // Too conservative: widen it.
            self.config.step
        } else {
            0.0
        };

        if adjustment == 0.0 {
            debug!(fp_rate, "feedback batch evaluated, no adjustment");
            return;
        }

        let (lo, hi) = self.config.sensitivity_bounds;
        let new_sensitivity = (self.sensitivity + adjustment).clamp(lo, hi);
        info!(
            fp_rate,
            from = self.sensitivity,
            to = new_sensitivity,
            "adapting sensitivity"
        );
        self.sensitivity = new_sensitivity;
        self.detector.update_sensitivity(new_sensitivity);
    }
}
