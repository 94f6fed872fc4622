//! Feature derivation configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the feature deriver reads and writes.
///
/// The `data_type` stem names both files: `<input_dir>/<data_type>.csv` is read
/// and `<output_dir>/<data_type>.csv` is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriverConfig {
    /// File name stem, e.g. "train" or "test"
    pub data_type: String,

    /// Directory holding the raw table
    pub input_dir: PathBuf,

    /// Directory receiving the derived table
    pub output_dir: PathBuf,

    /// Rows scanned to infer column types when reading CSV
    pub infer_schema_length: Option<usize>,
}

impl Default for DeriverConfig {
    fn default() -> Self {
        Self {
            data_type: "train".to_string(),
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            infer_schema_length: Some(10_000),
        }
    }
}

impl DeriverConfig {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    /// Builder method to set the input directory
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Builder method to set the output directory
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Builder method to set schema inference depth (`None` scans every row)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    pub fn input_path(&self) -> PathBuf {
        self.input_dir.join(format!("{}.csv", self.data_type))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_stem() {
        let config = DeriverConfig::new("test")
            .with_input_dir("/opt/ml/processing/input")
            .with_output_dir("/opt/ml/processing/output");

        assert_eq!(config.input_path(), PathBuf::from("/opt/ml/processing/input/test.csv"));
        assert_eq!(config.output_path(), PathBuf::from("/opt/ml/processing/output/test.csv"));
    }

    #[test]
    fn test_default_config() {
        let config = DeriverConfig::default();
        assert_eq!(config.data_type, "train");
        assert_eq!(config.infer_schema_length, Some(10_000));
    }
}
