//! End-to-end monitoring run: train, stream, detect, explain, adapt.
//!
//! Wires the collaborators together the way a deployment would: the
//! simulator stands in for the sensor feed, ground-truth labels stand in for
//! the operator reviewing each alert. The detection core never learns where
//! its inputs come from.

use crate::config::MonitorConfig;
use crate::detect::{AnomalyDetector, DetectorError};
use crate::explain::{AlertExplainer, Confidence, Explanation};
use crate::feedback::{FeedbackLabel, SensitivityController};
use crate::pipeline::{ReadingStore, ReadingValidator, StoreError};
use crate::reading::SensorReading;
use crate::sim::SensorSimulator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Monitor run failure.
#[derive(Debug)]
pub enum MonitorError {
    Detector(DetectorError),
    Store(StoreError),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detector(e) => write!(f, "detector error: {}", e),
            Self::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {}

impl From<DetectorError> for MonitorError {
    fn from(e: DetectorError) -> Self {
        Self::Detector(e)
    }
}

impl From<StoreError> for MonitorError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Alert severity, derived from explainer confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Warning,
}

/// One raised alert, as persisted to the alert log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub reading: SensorReading,
    pub explanation: Explanation,
    pub severity: Severity,
}

/// Key/value metrics serialized at the end of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunMetrics {
    pub final_sensitivity: f64,
    pub total_alerts: usize,
    pub feedback_history_count: usize,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub readings_processed: usize,
    pub alerts: Vec<Alert>,
    pub metrics: RunMetrics,
}

/// Orchestrates one full train-then-stream monitoring run.
pub struct Monitor {
    config: MonitorConfig,
    store: ReadingStore,
}

impl Monitor {
    pub fn new(config: MonitorConfig, data_dir: &Path) -> Result<Self, MonitorError> {
        Ok(Self {
            store: ReadingStore::new(data_dir)?,
            config,
        })
    }

    pub fn run(&self, num_readings: usize) -> Result<RunReport, MonitorError> {
        info!(num_readings, "starting monitoring run");

        let mut sim = SensorSimulator::new(self.config.baselines, self.config.sim_seed);
        let dataset = sim.generate_dataset(num_readings);

        // Training phase: the leading stretch of the stream is clean by
        // construction (anomalies are only injected past the train window).
        let cutoff = self.config.train_window.min(dataset.len());
        let training: Vec<SensorReading> = dataset[..cutoff].iter().map(|l| l.reading).collect();

        let detector = AnomalyDetector::new(self.config.detector);
        let mut controller =
            SensitivityController::new(detector, self.config.controller);
        info!(samples = cutoff, "training detector");
        controller.train(&training)?;

        let validator = ReadingValidator::new(self.config.valid_ranges);
        let explainer = AlertExplainer::new(self.config.baselines);

        // Monitoring phase.
        let mut alerts: Vec<Alert> = Vec::new();
        let mut processed = 0usize;

        for i in cutoff..dataset.len() {
            let labeled = &dataset[i];
            let reading = labeled.reading;

            if !validator.is_valid(&reading) {
                warn!(index = i, "skipping out-of-range reading");
                continue;
            }

            let start = i.saturating_sub(self.config.history_cap);
            let history: Vec<SensorReading> =
                dataset[start..i].iter().map(|l| l.reading).collect();

            let result = controller.detect(&reading, &history);
            processed += 1;

            if result.is_anomaly {
                let explanation = explainer.explain(&reading, &result.triggered);
                let severity = if explanation.confidence == Confidence::High {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                let alert = Alert {
                    id: alerts.len() as u64 + 1,
                    timestamp: reading.timestamp,
                    reading,
                    explanation,
                    severity,
                };
                info!(
                    id = alert.id,
                    cause = %alert.explanation.likely_cause,
                    ?severity,
                    models = alert.explanation.models_triggered.len(),
                    "alert raised"
                );

                // Simulated operator review against ground truth.
                let label = if labeled.is_anomaly {
                    FeedbackLabel::TruePositive
                } else {
                    FeedbackLabel::FalsePositive
                };
                controller.record_feedback(alert.id, label, reading.timestamp);
                alerts.push(alert);
            }

            if processed % 100 == 0 {
                info!(
                    processed,
                    alerts = alerts.len(),
                    sensitivity = controller.sensitivity(),
                    "monitoring progress"
                );
            }
        }

        // Final persistence.
        self.store.save_dataset(&dataset)?;
        self.store.save_alerts(&alerts)?;
        let metrics = RunMetrics {
            final_sensitivity: controller.sensitivity(),
            total_alerts: alerts.len(),
            feedback_history_count: controller.feedback_count(),
        };
        self.store.save_metrics(&metrics)?;

        info!(
            processed,
            alerts = alerts.len(),
            final_sensitivity = metrics.final_sensitivity,
            "run complete"
        );

        Ok(RunReport {
            readings_processed: processed,
            alerts,
            metrics,
        })
    }
}
