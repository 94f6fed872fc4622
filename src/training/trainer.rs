//! Training job: grid search, export CV results, persist the winner

use crate::error::{PipelineError, Result};
use crate::utils::{DataLoader, DataSaver};
use super::{
    config::TrainerConfig,
    grid_search::{Candidate, CandidateResult, GridSearch},
    persistence::save_model,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// File name of the CV results table inside the output data directory
pub const CV_RESULTS_FILE_NAME: &str = "cv_results.csv";

/// Summary of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_samples: usize,
    pub feature_names: Vec<String>,
    /// Importance of each predictor in the refit forest, aligned with `feature_names`
    pub feature_importances: Vec<f64>,
    pub best_params: Candidate,
    pub best_score: f64,
    pub cv_results: Vec<CandidateResult>,
    pub model_path: PathBuf,
    pub cv_results_path: PathBuf,
    pub duration_secs: f64,
}

/// Runs the training job end to end
pub struct Trainer;

impl Trainer {
    /// Read `<train_dir>/train.csv`, search, write `cv_results.csv` then `model.json`
    pub fn run(config: &TrainerConfig) -> Result<TrainingReport> {
        let start = Instant::now();
        let train_path = config.train_path();

        info!(path = %train_path.display(), "Reading training table");
        let df = DataLoader::new().load_csv(&train_path)?;

        let mut search = GridSearch::new(config.forest_params(), config.grid.clone())
            .with_n_splits(config.cv_folds);
        search.fit_frame(&df, &config.target_column)?;

        let (best_params, best_score) = match (search.best_params(), search.best_score()) {
            (Some(p), Some(s)) => (*p, s),
            _ => return Err(PipelineError::ModelNotFitted),
        };
        let feature_importances = search
            .best_estimator()
            .and_then(|forest| forest.feature_importances())
            .map(|imp| imp.to_vec())
            .unwrap_or_default();

        // The model is written last so a failed export leaves no artifact
        std::fs::create_dir_all(&config.output_data_dir)?;
        let cv_results_path = config.output_data_dir.join(CV_RESULTS_FILE_NAME);
        let mut table = cv_results_frame(search.cv_results())?;
        DataSaver::save_csv(&mut table, &cv_results_path)?;
        info!(path = %cv_results_path.display(), "Wrote CV results");

        let model_path = save_model(&search, &config.model_dir)?;

        Ok(TrainingReport {
            n_samples: df.height(),
            feature_names: search.feature_names().to_vec(),
            feature_importances,
            best_params,
            best_score,
            cv_results: search.cv_results().to_vec(),
            model_path,
            cv_results_path,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }
}

/// One row per candidate, one `split{i}_test_score` column per fold
pub fn cv_results_frame(results: &[CandidateResult]) -> Result<DataFrame> {
    let n_folds = results.first().map_or(0, |r| r.fold_scores.len());

    let mut columns: Vec<Column> = vec![
        Series::new(
            "params".into(),
            results.iter().map(|r| r.params.to_string()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "param_criterion".into(),
            results.iter().map(|r| r.params.criterion.to_string()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "param_max_depth".into(),
            results
                .iter()
                .map(|r| r.params.max_depth.map(|d| d as i64))
                .collect::<Vec<_>>(),
        )
        .into(),
    ];
    for fold in 0..n_folds {
        columns.push(
            Series::new(
                format!("split{}_test_score", fold).into(),
                results.iter().map(|r| r.fold_scores[fold]).collect::<Vec<_>>(),
            )
            .into(),
        );
    }
    columns.push(
        Series::new(
            "mean_test_score".into(),
            results.iter().map(|r| r.mean_score).collect::<Vec<_>>(),
        )
        .into(),
    );
    columns.push(
        Series::new(
            "std_test_score".into(),
            results.iter().map(|r| r.std_score).collect::<Vec<_>>(),
        )
        .into(),
    );
    columns.push(
        Series::new(
            "rank_test_score".into(),
            results.iter().map(|r| r.rank as i64).collect::<Vec<_>>(),
        )
        .into(),
    );
    columns.push(
        Series::new(
            "fit_time_secs".into(),
            results.iter().map(|r| r.fit_time_secs).collect::<Vec<_>>(),
        )
        .into(),
    );

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::decision_tree::Criterion;

    #[test]
    fn test_cv_results_frame_layout() {
        let results = vec![
            CandidateResult {
                params: Candidate { criterion: Criterion::Gini, max_depth: Some(1) },
                fold_scores: vec![0.5, 0.6, 0.7],
                mean_score: 0.6,
                std_score: 0.08,
                rank: 2,
                fit_time_secs: 0.1,
            },
            CandidateResult {
                params: Candidate { criterion: Criterion::Entropy, max_depth: Some(2) },
                fold_scores: vec![0.7, 0.7, 0.7],
                mean_score: 0.7,
                std_score: 0.0,
                rank: 1,
                fit_time_secs: 0.2,
            },
        ];

        let df = cv_results_frame(&results).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "params",
                "param_criterion",
                "param_max_depth",
                "split0_test_score",
                "split1_test_score",
                "split2_test_score",
                "mean_test_score",
                "std_test_score",
                "rank_test_score",
                "fit_time_secs",
            ]
        );
        let ranks: Vec<i64> = df
            .column("rank_test_score")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(ranks, vec![2, 1]);
    }

    #[test]
    fn test_missing_train_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig::new(dir.path(), dir.path().join("model"), dir.path().join("out"));
        assert!(Trainer::run(&config).is_err());
    }
}
