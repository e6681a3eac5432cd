//! Isolation forest for density-based outlier scoring.
//!
//! Anomalous points are easier to isolate with random axis-aligned splits,
//! so they end up with shorter average path lengths across a forest of
//! randomly built trees. The anomaly score is `2^(-E[h(x)] / c(n))` where
//! `c(n)` is the expected path length of an unsuccessful BST search.
//!
//! The outlier threshold is calibrated on the training scores so that the
//! expected flagged fraction of training data equals the configured
//! contamination rate. Fitting is always from scratch and fully reproducible
//! given the same data and seed.
//!
//! Reference: "Isolation Forest" (Liu, Ting, Zhou; ICDM 2008)

use super::ModelError;
use crate::reading::NUM_FEATURES;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant, used in the harmonic-number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsoNode {
    Internal {
        split_dim: usize,
        split_value: f64,
        left: Box<IsoNode>,
        right: Box<IsoNode>,
    },
    /// External node; `size` is the number of training points it absorbed.
    Leaf { size: usize },
}

/// Expected path length of an unsuccessful search in a BST of `n` points.
fn expected_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn build_tree(rows: &[[f64; NUM_FEATURES]], depth: usize, max_depth: usize, rng: &mut StdRng) -> IsoNode {
    if rows.len() <= 1 || depth >= max_depth {
        return IsoNode::Leaf { size: rows.len() };
    }

    // Candidate dimensions are those with an actual spread.
    let mut lo = rows[0];
    let mut hi = rows[0];
    for row in rows.iter().skip(1) {
        for i in 0..NUM_FEATURES {
            lo[i] = lo[i].min(row[i]);
            hi[i] = hi[i].max(row[i]);
        }
    }
    let spread: Vec<usize> = (0..NUM_FEATURES).filter(|&i| hi[i] > lo[i]).collect();
    if spread.is_empty() {
        // All points identical: nothing left to isolate.
        return IsoNode::Leaf { size: rows.len() };
    }

    let split_dim = spread[rng.random_range(0..spread.len())];
    let split_value = lo[split_dim] + rng.random::<f64>() * (hi[split_dim] - lo[split_dim]);

    let (left_rows, right_rows): (Vec<[f64; NUM_FEATURES]>, Vec<[f64; NUM_FEATURES]>) =
        rows.iter().copied().partition(|r| r[split_dim] < split_value);

    IsoNode::Internal {
        split_dim,
        split_value,
        left: Box::new(build_tree(&left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(&right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &IsoNode, row: &[f64; NUM_FEATURES], depth: f64) -> f64 {
    match node {
        IsoNode::Leaf { size } => depth + expected_path_length(*size),
        IsoNode::Internal {
            split_dim,
            split_value,
            left,
            right,
        } => {
            if row[*split_dim] < *split_value {
                path_length(left, row, depth + 1.0)
            } else {
                path_length(right, row, depth + 1.0)
            }
        }
    }
}

/// Density-based outlier model, trained once on normalized data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    num_trees: usize,
    sample_size: usize,
    contamination: f64,
    seed: u64,
    trees: Vec<IsoNode>,
    /// Effective per-tree subsample size after fitting.
    fitted_sample_size: usize,
    /// Scores above this are outliers; calibrated from the training scores.
    threshold: f64,
    fitted: bool,
}

impl IsolationForest {
    pub fn new(num_trees: usize, sample_size: usize, contamination: f64, seed: u64) -> Self {
        Self {
            num_trees: num_trees.max(1),
            sample_size: sample_size.max(2),
            contamination,
            seed,
            trees: Vec::new(),
            fitted_sample_size: 0,
            threshold: f64::MAX,
            fitted: false,
        }
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Build the forest over seeded random subsamples and calibrate the
    /// outlier threshold so the expected flagged fraction of the training
    /// data matches the contamination rate.
    pub fn fit(&mut self, rows: &[[f64; NUM_FEATURES]]) {
        if rows.is_empty() {
            return;
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let sample_size = self.sample_size.min(rows.len()).max(1);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let mut trees = Vec::with_capacity(self.num_trees);
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        for _ in 0..self.num_trees {
            // Partial Fisher-Yates: the first `sample_size` slots become a
            // uniform subsample without replacement.
            for i in 0..sample_size {
                let j = rng.random_range(i..indices.len());
                indices.swap(i, j);
            }
            let sample: Vec<[f64; NUM_FEATURES]> =
                indices[..sample_size].iter().map(|&i| rows[i]).collect();
            trees.push(build_tree(&sample, 0, max_depth, &mut rng));
        }

        self.trees = trees;
        self.fitted_sample_size = sample_size;
        self.fitted = true;
        self.threshold = self.calibrate_threshold(rows);
    }

    fn calibrate_threshold(&self, rows: &[[f64; NUM_FEATURES]]) -> f64 {
        let mut scores: Vec<f64> = rows.iter().map(|r| self.anomaly_score(r)).collect();
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        // The top `contamination * n` training scores count as outliers;
        // the next score down is the inlier ceiling.
        let outliers = (self.contamination * rows.len() as f64).floor() as usize;
        scores[outliers.min(scores.len() - 1)]
    }

    /// Raw anomaly score in (0, 1); higher is more isolated.
    pub fn anomaly_score(&self, row: &[f64; NUM_FEATURES]) -> f64 {
        let avg_path: f64 = self
            .trees
            .iter()
            .map(|t| path_length(t, row, 0.0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let c = expected_path_length(self.fitted_sample_size).max(1.0);
        2f64.powf(-avg_path / c)
    }

    /// Classify one normalized feature vector; `true` means outlier.
    pub fn predict(&self, row: &[f64; NUM_FEATURES]) -> Result<bool, ModelError> {
        if !self.fitted {
            return Err(ModelError::Untrained);
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }
        Ok(self.anomaly_score(row) > self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn cluster(n: usize, seed: u64) -> Vec<[f64; NUM_FEATURES]> {
        // Tight cluster around the origin, the shape normalized training
        // data takes after the scaler.
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                [
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ]
            })
            .collect()
    }

    #[test]
    fn test_far_point_is_outlier_center_is_not() {
        let data = cluster(400, 7);
        let mut forest = IsolationForest::new(100, 256, 0.05, 42);
        forest.fit(&data);

        assert!(forest.predict(&[50.0, 0.0, 0.0, 0.0]).unwrap());
        assert!(!forest.predict(&[0.0, 0.0, 0.0, 0.0]).unwrap());
    }

    #[test]
    fn test_training_flag_rate_tracks_contamination() {
        let data = cluster(400, 11);
        let mut forest = IsolationForest::new(100, 256, 0.05, 42);
        forest.fit(&data);

        let flagged = data
            .iter()
            .filter(|r| forest.predict(r).unwrap())
            .count() as f64
            / data.len() as f64;
        assert!(
            flagged <= 0.10,
            "flag rate {} should stay near contamination 0.05",
            flagged
        );
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let data = cluster(200, 3);
        let mut a = IsolationForest::new(50, 128, 0.05, 42);
        let mut b = IsolationForest::new(50, 128, 0.05, 42);
        a.fit(&data);
        b.fit(&data);

        let probe = [2.5, -1.0, 0.3, 4.0];
        assert_eq!(a.anomaly_score(&probe), b.anomaly_score(&probe));
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }

    #[test]
    fn test_unfitted_predict_is_error() {
        let forest = IsolationForest::new(10, 64, 0.05, 42);
        assert!(matches!(
            forest.predict(&[0.0; NUM_FEATURES]),
            Err(ModelError::Untrained)
        ));
    }

    #[test]
    fn test_non_finite_input_is_error() {
        let data = cluster(100, 5);
        let mut forest = IsolationForest::new(10, 64, 0.05, 42);
        forest.fit(&data);
        assert!(matches!(
            forest.predict(&[f64::NAN, 0.0, 0.0, 0.0]),
            Err(ModelError::NonFinite)
        ));
    }
}
