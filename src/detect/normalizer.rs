//! Per-feature centering/scaling transform.
//!
//! Fitted once on training data and applied identically to every subsequent
//! reading so the density and boundary models see comparable inputs.

use super::DetectorError;
use crate::reading::NUM_FEATURES;
use serde::{Deserialize, Serialize};

/// Mean/scale transform over the four measurement features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureNormalizer {
    mean: [f64; NUM_FEATURES],
    scale: [f64; NUM_FEATURES],
    fitted: bool,
}

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute per-feature mean and scale (population standard deviation)
    /// over the training rows. A feature with zero variance keeps scale 1.0
    /// so it passes through centered.
    pub fn fit(&mut self, rows: &[[f64; NUM_FEATURES]]) -> Result<(), DetectorError> {
        if rows.is_empty() {
            return Err(DetectorError::EmptyTrainingSet);
        }

        let n = rows.len() as f64;
        let mut mean = [0.0; NUM_FEATURES];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = [0.0; NUM_FEATURES];
        for row in rows {
            for i in 0..NUM_FEATURES {
                scale[i] += (row[i] - mean[i]).powi(2);
            }
        }
        for s in &mut scale {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        self.mean = mean;
        self.scale = scale;
        self.fitted = true;
        Ok(())
    }

    /// Apply `(x - mean) / scale` per feature.
    ///
    /// # Panics
    ///
    /// Panics if called before [`fit`](Self::fit); that is a programming
    /// error, not a runtime condition.
    pub fn transform(&self, row: &[f64; NUM_FEATURES]) -> [f64; NUM_FEATURES] {
        assert!(self.fitted, "FeatureNormalizer::transform called before fit");
        let mut out = [0.0; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            out[i] = (row[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    pub fn transform_batch(&self, rows: &[[f64; NUM_FEATURES]]) -> Vec<[f64; NUM_FEATURES]> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }
}
