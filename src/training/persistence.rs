//! Model artifact storage

use crate::error::{PipelineError, Result};
use super::grid_search::GridSearch;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the fitted search inside the model directory
pub const MODEL_FILE_NAME: &str = "model.json";

/// Path of the artifact inside `model_dir`
pub fn model_path(model_dir: &Path) -> PathBuf {
    model_dir.join(MODEL_FILE_NAME)
}

/// Write the fitted search to `<model_dir>/model.json`, creating the directory
pub fn save_model(search: &GridSearch, model_dir: &Path) -> Result<PathBuf> {
    if search.best_estimator().is_none() {
        return Err(PipelineError::ModelNotFitted);
    }

    std::fs::create_dir_all(model_dir)?;
    let path = model_path(model_dir);
    let writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer(writer, search)?;

    info!(path = %path.display(), "Saved model");
    Ok(path)
}

/// Restore a search saved by [`save_model`]
pub fn load_model(model_dir: &Path) -> Result<GridSearch> {
    let path = model_path(model_dir);
    let reader = BufReader::new(File::open(&path)?);
    let search: GridSearch = serde_json::from_reader(reader)?;

    if search.best_estimator().is_none() {
        return Err(PipelineError::ModelNotFitted);
    }
    info!(path = %path.display(), "Loaded model");
    Ok(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ForestParams, ParamGrid};
    use ndarray::{Array1, Array2};

    #[test]
    fn test_unfitted_model_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let search = GridSearch::default();
        assert!(matches!(save_model(&search, dir.path()), Err(PipelineError::ModelNotFitted)));
        assert!(!model_path(dir.path()).exists());
    }

    #[test]
    fn test_save_then_load_predicts_same() {
        let x = Array2::from_shape_fn((24, 2), |(i, j)| (i % 2) as f64 * 5.0 + j as f64 * 0.1);
        let y = Array1::from_shape_fn(24, |i| (i % 2) as f64);
        let base = ForestParams { n_estimators: 4, random_state: Some(3), ..Default::default() };
        let grid = ParamGrid { max_depth: vec![Some(1), Some(2)], ..Default::default() };
        let mut search = GridSearch::new(base, grid);
        search.fit(&x, &y).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("model");
        let path = save_model(&search, &nested).unwrap();
        assert_eq!(path, nested.join("model.json"));

        let restored = load_model(&nested).unwrap();
        assert_eq!(restored.best_params(), search.best_params());
        assert_eq!(restored.predict(&x).unwrap(), search.predict(&x).unwrap());
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_model(dir.path()), Err(PipelineError::IoError(_))));
    }
}
