//! Stratified cross-validation

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified K-Fold without shuffling.
///
/// Each fold keeps roughly the class proportions of the full target. Rows of
/// each class are handed to folds in their original order, so the splits are
/// fully determined by `y`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self { n_splits: 3 }
    }
}

impl StratifiedKFold {
    /// Create a new splitter
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Generate train/test splits for the labels `y`
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        let n_splits = self.n_splits;

        if n_splits < 2 {
            return Err(PipelineError::ValidationError(
                "n_splits must be at least 2".to_string()
            ));
        }
        if n_samples < n_splits {
            return Err(PipelineError::ValidationError(
                format!("n_samples ({}) must be >= n_splits ({})", n_samples, n_splits)
            ));
        }

        // Classes are numbered by first appearance
        let mut class_ids: HashMap<u64, usize> = HashMap::new();
        let y_encoded: Vec<usize> = y
            .iter()
            .map(|v| {
                let next = class_ids.len();
                *class_ids.entry(v.to_bits()).or_insert(next)
            })
            .collect();
        let n_classes = class_ids.len();

        let mut class_counts = vec![0usize; n_classes];
        for &c in &y_encoded {
            class_counts[c] += 1;
        }
        if class_counts.iter().all(|&count| count < n_splits) {
            return Err(PipelineError::ValidationError(format!(
                "n_splits ({}) cannot be greater than the number of members in each class",
                n_splits
            )));
        }

        // Deal the sorted labels round-robin to get per-fold class quotas
        let mut y_order = y_encoded.clone();
        y_order.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; n_splits];
        for (i, &c) in y_order.iter().enumerate() {
            allocation[i % n_splits][c] += 1;
        }

        let mut test_folds = vec![0usize; n_samples];
        for class in 0..n_classes {
            let folds_for_class = (0..n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]));
            let rows = y_encoded
                .iter()
                .enumerate()
                .filter(|(_, &c)| c == class)
                .map(|(row, _)| row);
            for (row, fold) in rows.zip(folds_for_class) {
                test_folds[row] = fold;
            }
        }

        let splits = (0..n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&row| test_folds[row] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(splits)
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0,  // 5 samples of class 0
            1.0, 1.0, 1.0, 1.0, 1.0,  // 5 samples of class 1
        ]);

        let splits = StratifiedKFold::new(5).split(&y).unwrap();

        assert_eq!(splits.len(), 5);

        // Each fold should have 1 sample from each class
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(positives, 1);
        }
    }

    #[test]
    fn test_folds_partition_rows() {
        let y = Array1::from_vec(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let splits = StratifiedKFold::new(3).split(&y).unwrap();

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..y.len()).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), y.len());
            for idx in &split.test_indices {
                assert!(!split.train_indices.contains(idx));
            }
        }
    }

    #[test]
    fn test_rows_assigned_in_order() {
        // 6 zeros and 3 ones over 3 folds: zeros go 0,0,1,1,2,2 and ones go 0,1,2
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let splits = StratifiedKFold::new(3).split(&y).unwrap();

        assert_eq!(splits[0].test_indices, vec![0, 1, 6]);
        assert_eq!(splits[1].test_indices, vec![2, 3, 7]);
        assert_eq!(splits[2].test_indices, vec![4, 5, 8]);
    }

    #[test]
    fn test_uneven_quotas() {
        // 4 zeros and 3 ones: sorted labels dealt round-robin give
        // fold0 {0,0,1}, fold1 {0,1}, fold2 {0,1}
        let y = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let splits = StratifiedKFold::new(3).split(&y).unwrap();

        assert_eq!(splits[0].test_indices, vec![0, 1, 2]);
        assert_eq!(splits[1].test_indices, vec![3, 4]);
        assert_eq!(splits[2].test_indices, vec![5, 6]);
    }

    #[test]
    fn test_too_many_splits() {
        let y = Array1::from_vec(vec![0.0, 1.0]);
        assert!(StratifiedKFold::new(3).split(&y).is_err());
        assert!(StratifiedKFold::new(1).split(&y).is_err());
    }

    #[test]
    fn test_every_class_too_small() {
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert!(StratifiedKFold::new(3).split(&y).is_err());
    }

    #[test]
    fn test_cv_results() {
        let results = CVResults::from_scores(vec![0.5, 0.7, 0.9]);
        assert_eq!(results.n_folds, 3);
        assert!((results.mean_score - 0.7).abs() < 1e-12);
        assert!((results.std_score - (0.08f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}
