//! Exhaustive hyperparameter search for the survival classifier
//!
//! Every `criterion` x `max_depth` combination of a [`ParamGrid`] is scored
//! by mean F1 over stratified folds. The first candidate with the highest
//! mean wins and is refit on the full training set.

use crate::error::{PipelineError, Result};
use super::{
    cross_validation::{CVResults, StratifiedKFold},
    decision_tree::Criterion,
    frame::{columns_to_array2, feature_columns, target_to_array1},
    metrics::f1_score,
    random_forest::RandomForest,
};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Fixed settings shared by every candidate forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub max_leaf_nodes: Option<usize>,
    pub n_jobs: Option<usize>,
    pub random_state: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            criterion: Criterion::Gini,
            max_depth: None,
            max_leaf_nodes: None,
            n_jobs: None,
            random_state: None,
        }
    }
}

impl ForestParams {
    /// Unfitted forest with these settings
    pub fn build(&self) -> RandomForest {
        let mut forest = RandomForest::new(self.n_estimators).with_criterion(self.criterion);
        forest.max_depth = self.max_depth;
        forest.max_leaf_nodes = self.max_leaf_nodes;
        forest.n_jobs = self.n_jobs;
        forest.random_state = self.random_state;
        forest
    }

    /// Copy of these settings with a candidate's values applied
    pub fn with_candidate(&self, candidate: &Candidate) -> Self {
        Self {
            criterion: candidate.criterion,
            max_depth: candidate.max_depth,
            ..self.clone()
        }
    }
}

/// One point of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_depth {
            Some(d) => write!(f, "{{criterion: {}, max_depth: {}}}", self.criterion, d),
            None => write!(f, "{{criterion: {}, max_depth: None}}", self.criterion),
        }
    }
}

/// Values to search for each tuned parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamGrid {
    pub criterion: Vec<Criterion>,
    pub max_depth: Vec<Option<usize>>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            criterion: vec![Criterion::Gini, Criterion::Entropy],
            max_depth: (1..=4).map(Some).collect(),
        }
    }
}

impl ParamGrid {
    /// All combinations, `max_depth` varying fastest
    pub fn candidates(&self) -> Vec<Candidate> {
        self.criterion
            .iter()
            .flat_map(|&criterion| {
                self.max_depth
                    .iter()
                    .map(move |&max_depth| Candidate { criterion, max_depth })
            })
            .collect()
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.criterion.len() * self.max_depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-validation outcome of one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: Candidate,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    /// 1 is best; tied means share the lowest rank
    pub rank: usize,
    pub fit_time_secs: f64,
}

/// Grid search over random-forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearch {
    pub base: ForestParams,
    pub grid: ParamGrid,
    pub n_splits: usize,
    cv_results: Vec<CandidateResult>,
    best_index: Option<usize>,
    best_estimator: Option<RandomForest>,
    feature_names: Vec<String>,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new(ForestParams::default(), ParamGrid::default())
    }
}

impl GridSearch {
    /// Create a new search with 3 folds
    pub fn new(base: ForestParams, grid: ParamGrid) -> Self {
        Self {
            base,
            grid,
            n_splits: 3,
            cv_results: Vec::new(),
            best_index: None,
            best_estimator: None,
            feature_names: Vec::new(),
        }
    }

    /// Set the number of folds
    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    /// Search on a table: every column but `target` is a predictor
    pub fn fit_frame(&mut self, df: &DataFrame, target: &str) -> Result<&mut Self> {
        let names = feature_columns(df, target);
        let x = columns_to_array2(df, &names)?;
        let y = target_to_array1(df, target)?;
        self.fit(&x, &y)?;
        self.feature_names = names;
        Ok(self)
    }

    /// Search on a feature matrix and 0/1 labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(PipelineError::ValidationError(format!(
                "Labels must be 0 or 1, found {}",
                bad
            )));
        }
        if self.grid.is_empty() {
            return Err(PipelineError::ConfigError("Parameter grid is empty".to_string()));
        }

        let start = Instant::now();
        let splits = StratifiedKFold::new(self.n_splits).split(y)?;
        let folds: Vec<_> = splits
            .iter()
            .map(|split| {
                let y_train = y.select(Axis(0), &split.train_indices);
                if !(y_train.iter().any(|&v| v == 0.0) && y_train.iter().any(|&v| v == 1.0)) {
                    return Err(PipelineError::TrainingError(format!(
                        "Training fold {} contains a single class",
                        split.fold_idx
                    )));
                }
                Ok((
                    x.select(Axis(0), &split.train_indices),
                    y_train,
                    x.select(Axis(0), &split.test_indices),
                    y.select(Axis(0), &split.test_indices),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let candidates = self.grid.candidates();
        info!(
            n_candidates = candidates.len(),
            n_splits = self.n_splits,
            n_samples = x.nrows(),
            n_features = x.ncols(),
            "Starting grid search"
        );

        let mut results: Vec<CandidateResult> = Vec::with_capacity(candidates.len());
        let mut best_index: Option<usize> = None;

        for candidate in candidates {
            let candidate_start = Instant::now();
            let params = self.base.with_candidate(&candidate);

            let scores = folds
                .iter()
                .map(|(x_train, y_train, x_test, y_test)| {
                    let mut forest = params.build();
                    forest.fit(x_train, y_train)?;
                    f1_score(y_test, &forest.predict(x_test)?)
                })
                .collect::<Result<Vec<f64>>>()?;

            let cv = CVResults::from_scores(scores);
            debug!(
                params = %candidate,
                mean_f1 = cv.mean_score,
                std_f1 = cv.std_score,
                "Scored candidate"
            );

            let is_better = match best_index {
                None => true,
                Some(idx) => cv.mean_score > results[idx].mean_score,
            };
            if is_better {
                best_index = Some(results.len());
            }

            results.push(CandidateResult {
                params: candidate,
                fold_scores: cv.scores,
                mean_score: cv.mean_score,
                std_score: cv.std_score,
                rank: 0,
                fit_time_secs: candidate_start.elapsed().as_secs_f64(),
            });
        }

        let means: Vec<f64> = results.iter().map(|r| r.mean_score).collect();
        for result in &mut results {
            result.rank = 1 + means.iter().filter(|&&m| m > result.mean_score).count();
        }

        let best_index = best_index
            .ok_or_else(|| PipelineError::TrainingError("No candidate was scored".to_string()))?;
        let best = &results[best_index];
        info!(
            best_params = %best.params,
            best_f1 = best.mean_score,
            "Refitting best candidate on full training set"
        );

        let mut estimator = self.base.with_candidate(&best.params).build();
        estimator.fit(x, y)?;

        self.cv_results = results;
        self.best_index = Some(best_index);
        self.best_estimator = Some(estimator);
        self.feature_names.clear();

        info!(elapsed = ?start.elapsed(), "Grid search finished");
        Ok(self)
    }

    /// Per-candidate results in grid order
    pub fn cv_results(&self) -> &[CandidateResult] {
        &self.cv_results
    }

    /// Winning combination
    pub fn best_params(&self) -> Option<&Candidate> {
        self.best_index.map(|idx| &self.cv_results[idx].params)
    }

    /// Mean F1 of the winning combination
    pub fn best_score(&self) -> Option<f64> {
        self.best_index.map(|idx| self.cv_results[idx].mean_score)
    }

    /// Forest refit on the full training set
    pub fn best_estimator(&self) -> Option<&RandomForest> {
        self.best_estimator.as_ref()
    }

    /// Predictor columns, when fitted through [`GridSearch::fit_frame`]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn estimator(&self) -> Result<&RandomForest> {
        self.best_estimator.as_ref().ok_or(PipelineError::ModelNotFitted)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.estimator()?.predict(x)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.estimator()?.predict_proba(x)
    }

    /// Predict on a table using the training column names
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let estimator = self.estimator()?;
        if self.feature_names.is_empty() {
            return Err(PipelineError::ValidationError(
                "Model was fitted without column names; use predict".to_string(),
            ));
        }
        let x = columns_to_array2(df, &self.feature_names)?;
        estimator.predict(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> (Array2<f64>, Array1<f64>) {
        // Every feature separates the classes with a wide gap
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            (i % 2) as f64 * 10.0 + ((i * (j + 3)) % 7) as f64 * 0.1
        });
        let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        (x, y)
    }

    #[test]
    fn test_default_grid_order() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 8);
        assert_eq!(candidates[0], Candidate { criterion: Criterion::Gini, max_depth: Some(1) });
        assert_eq!(candidates[3], Candidate { criterion: Criterion::Gini, max_depth: Some(4) });
        assert_eq!(candidates[4], Candidate { criterion: Criterion::Entropy, max_depth: Some(1) });
    }

    #[test]
    fn test_picks_one_candidate() {
        let (x, y) = separable(60);
        let base = ForestParams { n_estimators: 10, random_state: Some(0), ..Default::default() };
        let mut search = GridSearch::new(base, ParamGrid::default());
        search.fit(&x, &y).unwrap();

        assert_eq!(search.cv_results().len(), 8);
        let best = search.best_params().unwrap();
        assert!(ParamGrid::default().candidates().contains(best));
        assert!((search.best_score().unwrap() - 1.0).abs() < 1e-12);

        let preds = search.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_first_best_wins_ties() {
        // Every candidate scores 1.0
        let (x, y) = separable(30);
        let base = ForestParams { n_estimators: 5, random_state: Some(1), ..Default::default() };
        let mut search = GridSearch::new(base, ParamGrid::default());
        search.fit(&x, &y).unwrap();

        assert!(search.cv_results().iter().all(|r| r.rank == 1));
        assert_eq!(
            search.best_params(),
            Some(&Candidate { criterion: Criterion::Gini, max_depth: Some(1) })
        );
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let (x, _) = separable(12);
        let y = Array1::from_shape_fn(12, |i| (i % 3) as f64);
        let mut search = GridSearch::default();
        assert!(matches!(search.fit(&x, &y), Err(PipelineError::ValidationError(_))));
    }

    #[test]
    fn test_single_class_fails() {
        let (x, _) = separable(12);
        let y = Array1::zeros(12);
        let mut search = GridSearch::default();
        assert!(search.fit(&x, &y).is_err());
        assert!(search.best_params().is_none());
    }

    #[test]
    fn test_empty_grid() {
        let (x, y) = separable(12);
        let grid = ParamGrid { criterion: vec![], max_depth: vec![Some(1)] };
        let mut search = GridSearch::new(ForestParams::default(), grid);
        assert!(matches!(search.fit(&x, &y), Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_predict_before_fit() {
        let search = GridSearch::default();
        assert!(matches!(search.predict(&Array2::zeros((1, 3))), Err(PipelineError::ModelNotFitted)));
    }
}
