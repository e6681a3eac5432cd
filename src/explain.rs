//! Rule-based cause diagnosis for raised alerts.
//!
//! Consumes the detector's decision contract (the list of triggered model
//! names) plus the raw reading, and maps the deviation pattern to a likely
//! cause and a recommended operator action. The explainer never re-judges
//! whether the reading is anomalous; it only explains a decision already
//! made upstream.

use crate::config::Baselines;
use crate::detect::ModelName;
use crate::reading::SensorReading;
use serde::{Deserialize, Serialize};

/// Deviation level of one parameter relative to its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    High,
    Low,
    Normal,
}

/// Per-parameter deviation snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterStatus {
    pub ph: Level,
    pub turbidity: Level,
    pub tds: Level,
    pub temp: Level,
}

/// Explainer confidence, derived from ensemble agreement: `High` only when
/// all three models fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

/// Human-readable alert explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub anomalous_parameters: Vec<String>,
    pub likely_cause: String,
    pub recommended_action: String,
    pub confidence: Confidence,
    pub models_triggered: Vec<ModelName>,
}

/// Rule-based diagnosis over baseline deviations.
#[derive(Debug, Clone, Copy)]
pub struct AlertExplainer {
    baselines: Baselines,
}

impl AlertExplainer {
    pub fn new(baselines: Baselines) -> Self {
        Self { baselines }
    }

    /// Classify each parameter as High, Low, or Normal. Only deviations
    /// meaningfully past the baseline band count; turbidity, TDS and
    /// temperature only ever matter on the high side.
    pub fn parameter_status(&self, reading: &SensorReading) -> ParameterStatus {
        let ph = if reading.ph > self.baselines.ph.1 + 0.5 {
            Level::High
        } else if reading.ph < self.baselines.ph.0 - 0.5 {
            Level::Low
        } else {
            Level::Normal
        };

        let turbidity = if reading.turbidity_ntu > self.baselines.turbidity_ntu.1 + 1.0 {
            Level::High
        } else {
            Level::Normal
        };

        let tds = if reading.tds_mgl > self.baselines.tds_mgl.1 + 50.0 {
            Level::High
        } else {
            Level::Normal
        };

        let temp = if reading.temp_celsius > self.baselines.temp_celsius.1 + 3.0 {
            Level::High
        } else {
            Level::Normal
        };

        ParameterStatus {
            ph,
            turbidity,
            tds,
            temp,
        }
    }

    /// Match the deviation pattern to a likely cause and action. Rule order
    /// matters: more specific patterns are checked first.
    pub fn match_pattern(&self, status: &ParameterStatus) -> (&'static str, &'static str) {
        if status.ph == Level::High && status.turbidity == Level::Normal {
            return (
                "Alkaline Discharge",
                "Check nearby industrial outlets for alkaline waste.",
            );
        }
        if status.ph == Level::Low && status.turbidity == Level::Normal {
            return (
                "Acidic Discharge",
                "Potentially acidic industrial runoff. Inspect upstream.",
            );
        }
        if status.turbidity == Level::High && status.tds == Level::High {
            return (
                "Significant Contamination",
                "High turbidity and dissolved solids. Possible sewage or mixed waste.",
            );
        }
        if status.turbidity == Level::High && status.ph == Level::Normal {
            return (
                "Sewage/Sediment",
                "Likely sewage discharge or high sediment load. Check structural integrity.",
            );
        }
        if status.temp == Level::High {
            return (
                "Thermal Pollution",
                "Abnormal temperature rise. Check coolant discharge lines.",
            );
        }
        if status.ph != Level::Normal && status.turbidity == Level::High {
            return (
                "Complex Chemical Spill",
                "Multiple parameters deviation indicates complex spill. Immediate isolation required.",
            );
        }
        (
            "Unknown Anomaly",
            "Unusual pattern detected. Manual sampling recommended.",
        )
    }

    /// Build the full explanation for one flagged reading.
    pub fn explain(&self, reading: &SensorReading, triggered: &[ModelName]) -> Explanation {
        let status = self.parameter_status(reading);
        let (cause, action) = self.match_pattern(&status);

        let mut anomalous = Vec::new();
        for (name, level) in [
            ("pH", status.ph),
            ("turbidity", status.turbidity),
            ("tds", status.tds),
            ("temperature", status.temp),
        ] {
            match level {
                Level::High => anomalous.push(format!("{} is HIGH", name)),
                Level::Low => anomalous.push(format!("{} is LOW", name)),
                Level::Normal => {}
            }
        }

        let confidence = if triggered.len() == 3 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        Explanation {
            anomalous_parameters: anomalous,
            likely_cause: cause.to_string(),
            recommended_action: action.to_string(),
            confidence,
            models_triggered: triggered.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(ph: f64, turb: f64, tds: f64, temp: f64) -> SensorReading {
        SensorReading::new(Utc::now(), ph, turb, tds, temp)
    }

    fn explainer() -> AlertExplainer {
        AlertExplainer::new(Baselines::default())
    }

    #[test]
    fn test_high_ph_reads_as_alkaline_discharge() {
        let status = explainer().parameter_status(&reading(9.0, 1.5, 150.0, 22.0));
        assert_eq!(status.ph, Level::High);
        assert_eq!(status.turbidity, Level::Normal);

        let (cause, _) = explainer().match_pattern(&status);
        assert_eq!(cause, "Alkaline Discharge");
    }

    #[test]
    fn test_rule_table_branches() {
        let cases = [
            (reading(2.0, 1.0, 100.0, 25.0), "Acidic Discharge"),
            (reading(7.0, 100.0, 1000.0, 25.0), "Significant Contamination"),
            (reading(7.0, 100.0, 100.0, 25.0), "Sewage/Sediment"),
            (reading(7.0, 1.0, 100.0, 50.0), "Thermal Pollution"),
            (reading(14.0, 100.0, 100.0, 25.0), "Complex Chemical Spill"),
            (reading(7.0, 1.0, 100.0, 25.0), "Unknown Anomaly"),
        ];
        for (r, expected) in cases {
            let status = explainer().parameter_status(&r);
            let (cause, _) = explainer().match_pattern(&status);
            assert_eq!(cause, expected, "reading {:?}", r.features());
        }
    }

    #[test]
    fn test_confidence_requires_full_agreement() {
        let ex = explainer();
        let r = reading(2.0, 1.0, 100.0, 25.0);

        let all = ex.explain(
            &r,
            &[
                ModelName::RollingStats,
                ModelName::IsolationForest,
                ModelName::KernelBoundary,
            ],
        );
        assert_eq!(all.confidence, Confidence::High);

        let two = ex.explain(&r, &[ModelName::RollingStats, ModelName::IsolationForest]);
        assert_eq!(two.confidence, Confidence::Medium);
    }

    #[test]
    fn test_anomalous_parameter_listing() {
        let ex = explainer();
        let exp = ex.explain(&reading(2.0, 100.0, 1000.0, 50.0), &[]);
        assert_eq!(exp.anomalous_parameters.len(), 4);
        assert!(exp.anomalous_parameters[0].contains("LOW"));
    }
}
