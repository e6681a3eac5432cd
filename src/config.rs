//! Configuration for the monitoring pipeline.
//!
//! All tunables live in plain value structs passed into component
//! constructors, so tests can vary them independently. Nothing in here is a
//! process-wide global.

use serde::{Deserialize, Serialize};

/// Inclusive (low, high) range for one measurement.
pub type Range = (f64, f64);

/// Expected normal operating ranges under healthy conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Baselines {
    pub ph: Range,
    pub turbidity_ntu: Range,
    pub tds_mgl: Range,
    pub temp_celsius: Range,
}

impl Default for Baselines {
    fn default() -> Self {
        Self {
            ph: (7.0, 7.4),
            turbidity_ntu: (1.0, 2.0),
            tds_mgl: (100.0, 300.0),
            temp_celsius: (20.0, 25.0),
        }
    }
}

/// Hard physical limits. Readings outside these never reach the detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidRanges {
    pub ph: Range,
    pub turbidity_ntu: Range,
    pub tds_mgl: Range,
    pub temp_celsius: Range,
}

impl Default for ValidRanges {
    fn default() -> Self {
        Self {
            ph: (0.0, 14.0),
            turbidity_ntu: (0.0, 1000.0),
            tds_mgl: (0.0, 2000.0),
            temp_celsius: (-10.0, 50.0),
        }
    }
}

/// Detector and model parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Rolling window length for the statistical scorer. Histories shorter
    /// than this produce an unconditional "not anomalous" vote.
    pub window_size: usize,
    /// Z-score above which a single feature fires the statistical vote.
    pub z_threshold: f64,
    /// Initial expected anomaly fraction for the isolation forest.
    pub contamination: f64,
    /// Number of trees in the isolation forest.
    pub num_trees: usize,
    /// Per-tree subsample ceiling for the isolation forest.
    pub sample_size: usize,
    /// Looseness of the one-class boundary: the fraction of training data
    /// allowed to fall outside it. Not retuned by the controller.
    pub nu: f64,
    /// RBF kernel width for the one-class boundary.
    pub kernel_gamma: f64,
    /// Seed for every stochastic model, fixed so refits are reproducible.
    pub seed: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 24,
            z_threshold: 3.0,
            contamination: 0.05,
            num_trees: 100,
            sample_size: 256,
            nu: 0.05,
            kernel_gamma: 0.25,
            seed: 42,
        }
    }
}

/// Feedback controller parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Number of feedback records per evaluation batch. The log is cleared
    /// after every evaluation.
    pub batch_size: usize,
    /// False-positive rate above which sensitivity is stepped down.
    pub fp_rate_high: f64,
    /// False-positive rate below which sensitivity is stepped up.
    pub fp_rate_low: f64,
    /// Magnitude of one sensitivity adjustment.
    pub step: f64,
    /// Inclusive bounds the sensitivity is clamped into.
    pub sensitivity_bounds: Range,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            fp_rate_high: 0.6,
            fp_rate_low: 0.2,
            step: 0.01,
            sensitivity_bounds: (0.01, 0.10),
        }
    }
}

/// Top-level configuration for a monitor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub baselines: Baselines,
    pub valid_ranges: ValidRanges,
    pub detector: DetectorConfig,
    pub controller: ControllerConfig,
    /// Readings used for initial training before the streaming phase.
    pub train_window: usize,
    /// Maximum trailing history handed to each detection call.
    pub history_cap: usize,
    /// Seed for the sensor simulator.
    pub sim_seed: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            baselines: Baselines::default(),
            valid_ranges: ValidRanges::default(),
            detector: DetectorConfig::default(),
            controller: ControllerConfig::default(),
            train_window: 800,
            history_cap: 100,
            sim_seed: 42,
        }
    }
}
