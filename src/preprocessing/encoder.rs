//! Label encoding for categorical columns
//!
//! Classes are sorted before codes are assigned, so the code of a label is its
//! rank in the fitted vocabulary. An encoder fitted on a dataset column is only
//! valid for that dataset: two files encoded independently can disagree.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordinal label encoder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Column this encoder was fitted for, used in error messages
    column: String,
    /// Sorted, deduplicated labels; the index is the code
    classes: Vec<String>,
    mapping: HashMap<String, i64>,
    is_fitted: bool,
}

impl LabelEncoder {
    /// Create an unfitted encoder for the named column
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }

    /// Fit on an explicit vocabulary
    pub fn fit<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels.into_iter().map(|s| s.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();

        self.mapping = classes
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code as i64))
            .collect();
        self.classes = classes;
        self.is_fitted = true;
        self
    }

    /// Fit on the non-null values present in a DataFrame column
    pub fn fit_column(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let values = string_values(df, &self.column)?;
        let present: Vec<&str> = values.iter().flatten().map(String::as_str).collect();
        Ok(self.fit(present))
    }

    /// Encode a single label
    pub fn encode(&self, label: &str) -> Result<i64> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        self.mapping
            .get(label)
            .copied()
            .ok_or_else(|| PipelineError::UnknownLabel {
                column: self.column.clone(),
                label: label.to_string(),
            })
    }

    /// Encode a sequence of labels
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<i64>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Encode the fitted column of `df`, returning an Int64 series with the same name
    pub fn transform_column(&self, df: &DataFrame) -> Result<Series> {
        let values = string_values(df, &self.column)?;
        let codes = values
            .iter()
            .map(|v| match v {
                Some(label) => self.encode(label),
                None => Err(PipelineError::DataError(format!(
                    "null value in encoded column {}",
                    self.column
                ))),
            })
            .collect::<Result<Vec<i64>>>()?;

        Ok(Series::new(self.column.as_str().into(), codes))
    }

    /// Fit on the column's values and replace the column with its codes in place
    pub fn fit_transform_column(&mut self, df: &mut DataFrame) -> Result<()> {
        self.fit_column(df)?;
        let encoded = self.transform_column(df)?;
        df.with_column(encoded)?;
        Ok(())
    }

    /// Fitted classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Read a column as optional strings, casting non-string dtypes first
fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let col = df
        .column(column)
        .map_err(|_| PipelineError::FeatureNotFound(column.to_string()))?;
    let as_str = col.as_materialized_series().cast(&DataType::String)?;
    let ca = as_str.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_sorted_order() {
        let mut encoder = LabelEncoder::new("title");
        encoder.fit(["adult", "gentry", "miss", "military", "other", "child"]);

        assert_eq!(
            encoder.classes(),
            &["adult", "child", "gentry", "military", "miss", "other"]
        );
        assert_eq!(encoder.encode("adult").unwrap(), 0);
        assert_eq!(encoder.encode("child").unwrap(), 1);
        assert_eq!(encoder.encode("other").unwrap(), 5);
    }

    #[test]
    fn test_unknown_label_is_error() {
        let mut encoder = LabelEncoder::new("Sex");
        encoder.fit(["female", "male"]);

        let err = encoder.encode("unknown").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownLabel { .. }));
    }

    #[test]
    fn test_unfitted_encoder() {
        let encoder = LabelEncoder::new("Sex");
        assert!(matches!(encoder.encode("male"), Err(PipelineError::ModelNotFitted)));
    }

    #[test]
    fn test_fit_transform_column_in_place() {
        let mut df = df!(
            "Embarked" => &["S", "C", "S", "Q"],
            "Fare" => &[7.25, 71.28, 8.05, 8.46]
        )
        .unwrap();

        let mut encoder = LabelEncoder::new("Embarked");
        encoder.fit_transform_column(&mut df).unwrap();

        assert_eq!(encoder.classes(), &["C", "Q", "S"]);
        let codes: Vec<Option<i64>> = df.column("Embarked").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some(2), Some(0), Some(2), Some(1)]);
        // Position of the encoded column is preserved
        assert_eq!(df.get_column_names()[0].as_str(), "Embarked");
    }

    #[test]
    fn test_fit_depends_on_dataset() {
        let train = df!("Embarked" => &["C", "Q", "S"]).unwrap();
        let test = df!("Embarked" => &["Q", "S"]).unwrap();

        let mut on_train = LabelEncoder::new("Embarked");
        on_train.fit_column(&train).unwrap();
        let mut on_test = LabelEncoder::new("Embarked");
        on_test.fit_column(&test).unwrap();

        assert_ne!(on_train.encode("S").unwrap(), on_test.encode("S").unwrap());
    }
}
