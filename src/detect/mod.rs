//! Ensemble anomaly detector.
//!
//! Three independent scorers vote on every reading:
//! 1. Rolling z-score over the raw trailing window ([`stats::RollingStats`])
//! 2. Isolation forest over normalized features ([`forest::IsolationForest`])
//! 3. One-class kernel boundary over the same features ([`boundary::KernelBoundary`])
//!
//! A reading is anomalous when at least two of the three votes agree. The
//! detector owns all fitted state; the feedback controller retunes the
//! forest's contamination rate through [`AnomalyDetector::update_sensitivity`],
//! which rebuilds the forest from the stored training set rather than
//! mutating it in place.

pub mod boundary;
pub mod forest;
pub mod normalizer;
pub mod stats;

use crate::config::DetectorConfig;
use crate::reading::{NUM_FEATURES, SensorReading};
use boundary::KernelBoundary;
use forest::IsolationForest;
use normalizer::FeatureNormalizer;
use serde::{Deserialize, Serialize};
use stats::RollingStats;
use tracing::{info, warn};

/// Fatal misuse of the detector API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    /// `train` was called with no readings; there is no model to fit.
    EmptyTrainingSet,
}

impl std::fmt::Display for DetectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTrainingSet => write!(f, "cannot train on an empty set of readings"),
        }
    }
}

impl std::error::Error for DetectorError {}

/// Recoverable per-model prediction fault. A model returning this votes
/// `false` and is recorded as not triggered; the other votes still count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    /// The model has no fitted state.
    Untrained,
    /// The feature vector contained NaN or infinity.
    NonFinite,
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untrained => write!(f, "model has not been fitted"),
            Self::NonFinite => write!(f, "feature vector contains non-finite values"),
        }
    }
}

impl std::error::Error for ModelError {}

/// Identifiers for the three ensemble members.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelName {
    RollingStats = 0,
    IsolationForest = 1,
    KernelBoundary = 2,
}

impl ModelName {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RollingStats => "Rolling Stats",
            Self::IsolationForest => "Isolation Forest",
            Self::KernelBoundary => "One-Class Boundary",
        }
    }
}

/// The three independent votes for one reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSet {
    pub statistical: bool,
    pub density: bool,
    pub boundary: bool,
}

impl VoteSet {
    pub fn count(&self) -> usize {
        self.statistical as usize + self.density as usize + self.boundary as usize
    }

    /// Majority rule: anomaly iff at least 2 of 3 votes are true. Fixed
    /// design constant; with three voters a tie is impossible.
    pub fn decision(&self) -> bool {
        self.count() >= 2
    }

    /// Names of the models whose vote was true, in fixed order. This list is
    /// the contract the downstream explainer builds its confidence on.
    pub fn triggered(&self) -> Vec<ModelName> {
        let mut out = Vec::with_capacity(3);
        if self.statistical {
            out.push(ModelName::RollingStats);
        }
        if self.density {
            out.push(ModelName::IsolationForest);
        }
        if self.boundary {
            out.push(ModelName::KernelBoundary);
        }
        out
    }
}

/// Result of one detection call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub is_anomaly: bool,
    pub votes: VoteSet,
    pub triggered: Vec<ModelName>,
}

impl Detection {
    /// The degraded "no anomaly, no votes" result returned before training
    /// has completed.
    pub fn none() -> Self {
        Self {
            is_anomaly: false,
            votes: VoteSet::default(),
            triggered: Vec::new(),
        }
    }

    fn from_votes(votes: VoteSet) -> Self {
        Self {
            is_anomaly: votes.decision(),
            triggered: votes.triggered(),
            votes,
        }
    }
}

/// Ensemble detector owning the normalizer, both trained models, and the
/// normalized training set retained for retraining.
pub struct AnomalyDetector {
    config: DetectorConfig,
    stats: RollingStats,
    normalizer: FeatureNormalizer,
    forest: IsolationForest,
    boundary: KernelBoundary,
    /// Normalized training matrix, captured by `train` and reused verbatim
    /// whenever the density model is rebuilt. Never mutated elsewhere.
    training_set: Option<Vec<[f64; NUM_FEATURES]>>,
    contamination: f64,
    trained: bool,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            stats: RollingStats::new(config.window_size, config.z_threshold),
            normalizer: FeatureNormalizer::new(),
            forest: IsolationForest::new(
                config.num_trees,
                config.sample_size,
                config.contamination,
                config.seed,
            ),
            boundary: KernelBoundary::new(config.nu, config.kernel_gamma),
            training_set: None,
            contamination: config.contamination,
            trained: false,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Current expected-anomaly fraction of the density model.
    pub fn current_sensitivity(&self) -> f64 {
        self.contamination
    }

    /// Fit the normalizer and both models on pre-validated normal readings.
    /// Re-entrant: calling again performs a full refit of everything.
    pub fn train(&mut self, readings: &[SensorReading]) -> Result<(), DetectorError> {
        if readings.is_empty() {
            return Err(DetectorError::EmptyTrainingSet);
        }

        let rows: Vec<[f64; NUM_FEATURES]> = readings.iter().map(|r| r.features()).collect();
        self.normalizer.fit(&rows)?;
        let normalized = self.normalizer.transform_batch(&rows);

        let mut forest = IsolationForest::new(
            self.config.num_trees,
            self.config.sample_size,
            self.contamination,
            self.config.seed,
        );
        forest.fit(&normalized);
        self.forest = forest;

        let mut boundary = KernelBoundary::new(self.config.nu, self.config.kernel_gamma);
        boundary.fit(&normalized);
        self.boundary = boundary;

        self.training_set = Some(normalized);
        self.trained = true;
        info!(
            samples = readings.len(),
            contamination = self.contamination,
            "detector trained"
        );
        Ok(())
    }

    /// Vote on one reading against its trailing history.
    ///
    /// Before training this returns [`Detection::none`] rather than an
    /// error, so the surrounding pipeline keeps running during warm-up. Each
    /// model votes independently; a prediction fault in one model degrades
    /// that vote to `false` without suppressing the others.
    pub fn detect(&self, reading: &SensorReading, history: &[SensorReading]) -> Detection {
        if !self.trained {
            return Detection::none();
        }

        let statistical = self.stats.score(reading, history);
        let normalized = self.normalizer.transform(&reading.features());

        let density = self.forest.predict(&normalized).unwrap_or_else(|e| {
            warn!(model = ModelName::IsolationForest.name(), error = %e, "vote degraded to false");
            false
        });
        let boundary = self.boundary.predict(&normalized).unwrap_or_else(|e| {
            warn!(model = ModelName::KernelBoundary.name(), error = %e, "vote degraded to false");
            false
        });

        Detection::from_votes(VoteSet {
            statistical,
            density,
            boundary,
        })
    }

    /// Set the density model's expected-anomaly fraction and rebuild it from
    /// the stored training set. The caller (the feedback controller) is
    /// responsible for clamping; the value is taken as given. Before the
    /// first training this only stores the parameter for future use.
    pub fn update_sensitivity(&mut self, fraction: f64) {
        self.contamination = fraction;
        if let Some(training_set) = &self.training_set {
            let mut forest = IsolationForest::new(
                self.config.num_trees,
                self.config.sample_size,
                fraction,
                self.config.seed,
            );
            forest.fit(training_set);
            self.forest = forest;
            info!(contamination = fraction, "density model retrained");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn synthetic_normal(n: usize, seed: u64) -> Vec<SensorReading> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                SensorReading::new(
                    Utc::now(),
                    rng.random_range(7.0..7.4),
                    rng.random_range(1.0..2.0),
                    rng.random_range(100.0..300.0),
                    rng.random_range(20.0..25.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_majority_decision_table() {
        let make = |s, d, b| VoteSet {
            statistical: s,
            density: d,
            boundary: b,
        };
        assert!(!make(false, false, false).decision());
        assert!(!make(true, false, false).decision());
        assert!(!make(false, true, false).decision());
        assert!(!make(false, false, true).decision());
        assert!(make(true, true, false).decision());
        assert!(make(true, false, true).decision());
        assert!(make(false, true, true).decision());
        assert!(make(true, true, true).decision());
    }

    #[test]
    fn test_single_flip_from_one_true_changes_decision() {
        // With exactly one vote true, flipping any false vote to true must
        // flip the decision; with zero true, a single flip must not.
        let base = VoteSet {
            statistical: true,
            density: false,
            boundary: false,
        };
        assert!(!base.decision());
        for flipped in [
            VoteSet { density: true, ..base },
            VoteSet { boundary: true, ..base },
        ] {
            assert!(flipped.decision());
        }

        let none = VoteSet::default();
        for flipped in [
            VoteSet { statistical: true, ..none },
            VoteSet { density: true, ..none },
            VoteSet { boundary: true, ..none },
        ] {
            assert!(!flipped.decision());
        }
    }

    #[test]
    fn test_detect_before_train_is_defined_degraded_result() {
        let detector = AnomalyDetector::new(DetectorConfig::default());
        let reading = SensorReading::new(Utc::now(), 14.0, 900.0, 1900.0, 49.0);
        let result = detector.detect(&reading, &[]);
        assert!(!result.is_anomaly);
        assert_eq!(result.votes, VoteSet::default());
        assert!(result.triggered.is_empty());
    }

    #[test]
    fn test_train_empty_is_fatal() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        assert_eq!(detector.train(&[]), Err(DetectorError::EmptyTrainingSet));
        assert!(!detector.is_trained());
    }

    #[test]
    fn test_normal_reading_is_not_anomalous() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        let training = synthetic_normal(200, 1);
        detector.train(&training).unwrap();

        let reading = SensorReading::new(Utc::now(), 7.2, 1.5, 200.0, 22.5);
        let history = synthetic_normal(30, 2);
        let result = detector.detect(&reading, &history);
        assert!(!result.is_anomaly, "baseline reading flagged: {:?}", result);
    }

    #[test]
    fn test_extreme_reading_triggers_all_models() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        detector.train(&synthetic_normal(200, 1)).unwrap();

        let reading = SensorReading::new(Utc::now(), 13.5, 400.0, 1500.0, 48.0);
        let history = synthetic_normal(30, 2);
        let result = detector.detect(&reading, &history);
        assert!(result.is_anomaly);
        assert_eq!(result.votes.count(), 3);
        assert_eq!(result.triggered.len(), 3);
    }

    #[test]
    fn test_update_sensitivity_before_train_only_stores() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        detector.update_sensitivity(0.08);
        assert_eq!(detector.current_sensitivity(), 0.08);
        assert!(!detector.is_trained());

        // The stored value is used by the next training pass.
        detector.train(&synthetic_normal(100, 3)).unwrap();
        assert_eq!(detector.current_sensitivity(), 0.08);
    }

    #[test]
    fn test_update_sensitivity_retrains_density_model_only() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        detector.train(&synthetic_normal(200, 1)).unwrap();

        detector.update_sensitivity(0.10);
        assert_eq!(detector.current_sensitivity(), 0.10);
        assert!(detector.is_trained());

        // Detection keeps working against the replaced forest.
        let reading = SensorReading::new(Utc::now(), 7.2, 1.5, 200.0, 22.5);
        let result = detector.detect(&reading, &[]);
        assert!(!result.is_anomaly);
    }

    #[test]
    fn test_retrain_is_full_refit() {
        let mut detector = AnomalyDetector::new(DetectorConfig::default());
        detector.train(&synthetic_normal(200, 1)).unwrap();
        // Second train call on different data succeeds and stays trained.
        detector.train(&synthetic_normal(150, 9)).unwrap();
        assert!(detector.is_trained());
    }
}
