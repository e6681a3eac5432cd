//! One-class boundary model over an RBF kernel.
//!
//! Scores a point by its mean RBF similarity to the training set,
//! `s(x) = mean_i exp(-gamma * ||x - x_i||^2)`, and declares an outlier when
//! the similarity falls below a threshold calibrated so that roughly `nu` of
//! the training data sits outside the boundary. Deterministic: no randomness
//! anywhere in fit or predict.

use super::ModelError;
use crate::reading::NUM_FEATURES;
use serde::{Deserialize, Serialize};

/// Boundary-based outlier model, trained once on normalized data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelBoundary {
    nu: f64,
    gamma: f64,
    support: Vec<[f64; NUM_FEATURES]>,
    /// Similarities below this are outside the boundary.
    threshold: f64,
    fitted: bool,
}

impl KernelBoundary {
    pub fn new(nu: f64, gamma: f64) -> Self {
        Self {
            nu: nu.clamp(0.0, 1.0),
            gamma: gamma.max(1e-6),
            support: Vec::new(),
            threshold: 0.0,
            fitted: false,
        }
    }

    /// Store the training matrix and set the boundary at the `nu` quantile
    /// of the training points' own similarity scores.
    pub fn fit(&mut self, rows: &[[f64; NUM_FEATURES]]) {
        if rows.is_empty() {
            return;
        }
        self.support = rows.to_vec();

        let mut self_scores: Vec<f64> = rows.iter().map(|r| self.similarity(r)).collect();
        self_scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // The lowest `nu * n` training similarities fall outside; the next
        // one up anchors the boundary.
        let outside = (self.nu * rows.len() as f64).floor() as usize;
        self.threshold = self_scores[outside.min(self_scores.len() - 1)];
        self.fitted = true;
    }

    /// Mean RBF similarity of `row` to the training set, in (0, 1].
    fn similarity(&self, row: &[f64; NUM_FEATURES]) -> f64 {
        let total: f64 = self
            .support
            .iter()
            .map(|s| {
                let sq_dist: f64 = row
                    .iter()
                    .zip(s)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                (-self.gamma * sq_dist).exp()
            })
            .sum();
        total / self.support.len() as f64
    }

    /// Classify one normalized feature vector; `true` means outlier.
    pub fn predict(&self, row: &[f64; NUM_FEATURES]) -> Result<bool, ModelError> {
        if !self.fitted {
            return Err(ModelError::Untrained);
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(self.similarity(row) < self.threshold)
    }
}
