//! Binary classification metrics

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Label treated as the positive class
pub const POSITIVE_LABEL: f64 = 1.0;

/// Metrics for a binary classifier, positive class `1`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Compute metrics from true and predicted labels.
    ///
    /// Precision, recall and F1 are reported as 0 when undefined.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);
        let n = y_true.len();

        let accuracy = if n > 0 { (tp + tn) as f64 / n as f64 } else { 0.0 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = ratio(2 * tp, 2 * tp + fp + fn_);

        Ok(Self {
            accuracy,
            precision,
            recall,
            f1_score,
            n_samples: n,
        })
    }
}

/// F1 score of the positive class `1`
pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    Ok(ClassificationMetrics::compute(y_true, y_pred)?.f1_score)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let t_pos = *t == POSITIVE_LABEL;
        let p_pos = *p == POSITIVE_LABEL;

        match (t_pos, p_pos) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let metrics = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();

        // tp=3 fp=1 tn=3 fn=1
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        assert!((metrics.precision - 0.75).abs() < 1e-12);
        assert!((metrics.recall - 0.75).abs() < 1e-12);
        assert!((metrics.f1_score - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_f1_uneven() {
        let y_true = array![1.0, 1.0, 1.0, 0.0];
        let y_pred = array![1.0, 0.0, 0.0, 0.0];
        // precision 1, recall 1/3
        let f1 = f1_score(&y_true, &y_pred).unwrap();
        assert!((f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_f1_no_positive_predictions() {
        let y_true = array![1.0, 0.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0];
        assert_eq!(f1_score(&y_true, &y_pred).unwrap(), 0.0);
    }

    #[test]
    fn test_f1_perfect() {
        let y = array![0.0, 1.0, 1.0, 0.0];
        assert_eq!(f1_score(&y, &y).unwrap(), 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(f1_score(&array![1.0, 0.0], &array![1.0]).is_err());
    }
}
