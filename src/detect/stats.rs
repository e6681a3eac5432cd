//! Rolling-window z-score scorer.
//!
//! Operates on raw (unscaled) readings against a trailing history window.
//! No fitted state: the caller supplies the history on every call, and the
//! scorer is fully deterministic.

use crate::reading::{Feature, SensorReading};

/// Statistical outlier test over a trailing window of prior readings.
#[derive(Debug, Clone, Copy)]
pub struct RollingStats {
    window_size: usize,
    z_threshold: f64,
}

impl RollingStats {
    pub fn new(window_size: usize, z_threshold: f64) -> Self {
        Self {
            window_size: window_size.max(2),
            z_threshold,
        }
    }

    /// Vote on one reading given its history (most-recent-last).
    ///
    /// Returns `false` when the history is shorter than the window
    /// (insufficient data, not an error). A feature whose window standard
    /// deviation is exactly zero cannot be evaluated and is skipped. Any
    /// single feature with `|x - mean| / std` above the threshold fires the
    /// vote immediately.
    pub fn score(&self, reading: &SensorReading, history: &[SensorReading]) -> bool {
        if history.len() < self.window_size {
            return false;
        }

        let window = &history[history.len() - self.window_size..];
        let n = window.len() as f64;

        for feature in Feature::ALL {
            let mean: f64 = window.iter().map(|r| r.feature(feature)).sum::<f64>() / n;
            // Sample standard deviation (n - 1 denominator).
            let var: f64 = window
                .iter()
                .map(|r| (r.feature(feature) - mean).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            let std = var.sqrt();

            if std == 0.0 {
                continue;
            }

            let z = (reading.feature(feature) - mean).abs() / std;
            if z > self.z_threshold {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(ph: f64, turb: f64, tds: f64, temp: f64) -> SensorReading {
        SensorReading::new(Utc::now(), ph, turb, tds, temp)
    }

    fn steady_history(len: usize) -> Vec<SensorReading> {
        // Small alternating jitter so standard deviations are nonzero.
        (0..len)
            .map(|i| {
                let j = if i % 2 == 0 { 0.05 } else { -0.05 };
                reading(7.2 + j, 1.5 + j, 200.0 + j * 10.0, 22.0 + j)
            })
            .collect()
    }

    #[test]
    fn test_short_history_never_votes() {
        let scorer = RollingStats::new(24, 3.0);
        let history = steady_history(23);
        // Wildly anomalous reading, but the window is one short.
        assert!(!scorer.score(&reading(14.0, 900.0, 1900.0, 49.0), &history));
    }

    #[test]
    fn test_spike_fires_vote() {
        let scorer = RollingStats::new(24, 3.0);
        let history = steady_history(30);
        assert!(scorer.score(&reading(14.0, 1.5, 200.0, 22.0), &history));
    }

    #[test]
    fn test_normal_reading_stays_quiet() {
        let scorer = RollingStats::new(24, 3.0);
        let history = steady_history(30);
        assert!(!scorer.score(&reading(7.2, 1.5, 200.0, 22.0), &history));
    }

    #[test]
    fn test_zero_std_feature_is_skipped() {
        let scorer = RollingStats::new(24, 3.0);
        // pH is perfectly constant: even a huge pH deviation cannot be
        // evaluated, and every other feature is on baseline.
        let history: Vec<_> = (0..30)
            .map(|i| {
                let j = if i % 2 == 0 { 0.05 } else { -0.05 };
                reading(7.2, 1.5 + j, 200.0 + j * 10.0, 22.0 + j)
            })
            .collect();
        assert!(!scorer.score(&reading(14.0, 1.5, 200.0, 22.0), &history));
    }

    #[test]
    fn test_uses_only_last_window() {
        let scorer = RollingStats::new(24, 3.0);
        // Old history is extreme, but the last 24 entries are steady; a
        // reading matching the recent window must not fire.
        let mut history: Vec<_> = (0..10).map(|_| reading(1.0, 500.0, 1500.0, 45.0)).collect();
        history.extend(steady_history(24));
        assert!(!scorer.score(&reading(7.2, 1.5, 200.0, 22.0), &history));
    }
}
