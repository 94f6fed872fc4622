//! Training job configuration

use crate::error::{PipelineError, Result};
use super::grid_search::{ForestParams, ParamGrid};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inputs and settings of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Directory holding the training table
    pub train_dir: PathBuf,

    /// Directory receiving the model artifact
    pub model_dir: PathBuf,

    /// Directory receiving the CV results table
    pub output_data_dir: PathBuf,

    /// Label column
    pub target_column: String,

    /// File name of the training table inside `train_dir`
    pub train_file: String,

    /// Leaf cap applied to every candidate forest (`None` = unlimited)
    pub max_leaf_nodes: Option<usize>,

    /// Trees per forest
    pub n_estimators: usize,

    /// Stratified folds per candidate
    pub cv_folds: usize,

    /// Tree-building threads (`None` = all cores)
    pub n_jobs: Option<usize>,

    /// Seed for bootstrap and feature sampling
    pub random_state: Option<u64>,

    /// Hyperparameter grid
    pub grid: ParamGrid,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            train_dir: PathBuf::from("."),
            model_dir: PathBuf::from("."),
            output_data_dir: PathBuf::from("."),
            target_column: "Survived".to_string(),
            train_file: "train.csv".to_string(),
            max_leaf_nodes: None,
            n_estimators: 100,
            cv_folds: 3,
            n_jobs: None,
            random_state: None,
            grid: ParamGrid::default(),
        }
    }
}

impl TrainerConfig {
    pub fn new(train_dir: impl AsRef<Path>, model_dir: impl AsRef<Path>, output_data_dir: impl AsRef<Path>) -> Self {
        Self {
            train_dir: train_dir.as_ref().to_path_buf(),
            model_dir: model_dir.as_ref().to_path_buf(),
            output_data_dir: output_data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Builder method to cap leaves per tree
    pub fn with_max_leaf_nodes(mut self, max_leaf_nodes: Option<usize>) -> Self {
        self.max_leaf_nodes = max_leaf_nodes;
        self
    }

    /// Builder method to set trees per forest
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set the number of folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set tree-building threads
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Builder method to replace the grid
    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn train_path(&self) -> PathBuf {
        self.train_dir.join(&self.train_file)
    }

    /// Settings shared by every candidate
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_leaf_nodes: self.max_leaf_nodes,
            n_jobs: self.n_jobs,
            random_state: self.random_state,
            ..ForestParams::default()
        }
    }
}

/// Interpret the command-line leaf cap: any value below 1 means unlimited
pub fn max_leaf_nodes_from_arg(value: i64) -> Result<Option<usize>> {
    match value {
        v if v <= 0 => Ok(None),
        1 => Err(PipelineError::InvalidParameter {
            name: "max_leaf_nodes".to_string(),
            value: value.to_string(),
            reason: "must be at least 2, or -1 for unlimited".to_string(),
        }),
        v => Ok(Some(v as usize)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainerConfig::default();
        assert_eq!(config.target_column, "Survived");
        assert_eq!(config.cv_folds, 3);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.grid.len(), 8);
    }

    #[test]
    fn test_train_path() {
        let config = TrainerConfig::new("/opt/ml/input/data/train", "/opt/ml/model", "/opt/ml/output/data");
        assert_eq!(config.train_path(), PathBuf::from("/opt/ml/input/data/train/train.csv"));
    }

    #[test]
    fn test_forest_params_carry_leaf_cap() {
        let params = TrainerConfig::default()
            .with_max_leaf_nodes(Some(8))
            .with_random_state(5)
            .forest_params();
        assert_eq!(params.max_leaf_nodes, Some(8));
        assert_eq!(params.random_state, Some(5));
        assert_eq!(params.n_estimators, 100);
    }

    #[test]
    fn test_max_leaf_nodes_arg() {
        assert_eq!(max_leaf_nodes_from_arg(-1).unwrap(), None);
        assert_eq!(max_leaf_nodes_from_arg(0).unwrap(), None);
        assert_eq!(max_leaf_nodes_from_arg(10).unwrap(), Some(10));
        assert!(max_leaf_nodes_from_arg(1).is_err());
    }
}
