//! # aquaguard - adaptive water-quality anomaly monitoring
//!
//! Simulates a water-quality sensor stream, flags anomalous readings with an
//! ensemble of three detectors, explains each alert with a rule-based
//! diagnosis, and adapts detection sensitivity from operator feedback.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           aquaguard                              │
//! │                                                                  │
//! │  ┌───────────┐   ┌────────────┐   ┌───────────────────────────┐  │
//! │  │ Simulator │──▶│ Validator  │──▶│      AnomalyDetector      │  │
//! │  │ (sensors) │   │ (pipeline) │   │                           │  │
//! │  └───────────┘   └────────────┘   │  Rolling Stats  (raw)     │  │
//! │                                   │  Isolation Forest (norm.) │  │
//! │                                   │  Kernel Boundary  (norm.) │  │
//! │                                   │        │ majority vote    │  │
//! │                                   └────────┼──────────────────┘  │
//! │                                            ▼                     │
//! │  ┌───────────────────────┐        ┌─────────────────┐            │
//! │  │ SensitivityController │◀───────│  AlertExplainer │            │
//! │  │ (feedback batches)    │ labels │  (cause rules)  │            │
//! │  └───────────┬───────────┘        └─────────────────┘            │
//! │              └── retunes forest contamination, retrains          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key design points
//!
//! 1. **Independent votes** - the statistical scorer sees raw readings plus
//!    a trailing window; the two trained models see normalizer output. A
//!    fault in one model never suppresses the other votes.
//!
//! 2. **Majority decision** - a reading is anomalous iff at least two of the
//!    three votes agree. The triggered-model list is the contract the
//!    explainer derives its confidence from.
//!
//! 3. **Closed feedback loop** - operator labels accumulate in batches of
//!    20; the false-positive rate steps the density model's expected-anomaly
//!    fraction up or down within [0.01, 0.10], rebuilding that model from
//!    the retained training set. The batch log is reset after every
//!    evaluation.
//!
//! 4. **Determinism** - every stochastic component takes an explicit seed;
//!    identical input and seed reproduce identical decisions.

pub mod config;
pub mod detect;
pub mod explain;
pub mod feedback;
pub mod monitor;
pub mod pipeline;
pub mod reading;
pub mod sim;

// Re-exports for convenience
pub use config::{Baselines, ControllerConfig, DetectorConfig, MonitorConfig, ValidRanges};
pub use detect::{AnomalyDetector, Detection, DetectorError, ModelName, VoteSet};
pub use explain::{AlertExplainer, Confidence, Explanation};
pub use feedback::{FeedbackLabel, FeedbackRecord, SensitivityController};
pub use monitor::{Alert, Monitor, RunMetrics, RunReport, Severity};
pub use pipeline::{ReadingStore, ReadingValidator};
pub use reading::{Feature, NUM_FEATURES, SensorReading};
pub use sim::{AnomalyKind, LabeledReading, SensorSimulator};
