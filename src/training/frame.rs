//! DataFrame to ndarray conversion for model fitting

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Every column name except `target`, in table order
pub fn feature_columns(df: &DataFrame, target: &str) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != target)
        .map(|s| s.to_string())
        .collect()
}

/// Extract named columns into a row-major `Array2<f64>`.
///
/// Booleans become 0/1. Text columns and missing values are rejected.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| column_values(df, col_name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Extract the label column, truncated to integers
pub fn target_to_array1(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let column = df
        .column(target)
        .map_err(|_| PipelineError::FeatureNotFound(target.to_string()))?;
    if column.null_count() > 0 {
        return Err(PipelineError::DataError(format!(
            "Label column '{}' has {} missing values",
            target,
            column.null_count()
        )));
    }

    let as_int = column
        .cast(&DataType::Int64)
        .map_err(|e| PipelineError::DataError(format!("{}: {}", target, e)))?;
    // Non-numeric text casts to null rather than failing
    if as_int.null_count() > 0 {
        return Err(PipelineError::DataError(format!(
            "Label column '{}' is not integer-valued",
            target
        )));
    }

    Ok(as_int
        .i64()?
        .into_no_null_iter()
        .map(|v| v as f64)
        .collect())
}

fn column_values(df: &DataFrame, col_name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(col_name)
        .map_err(|_| PipelineError::FeatureNotFound(col_name.to_string()))?;

    let dtype = column.dtype();
    if !(dtype.is_integer() || dtype.is_float() || dtype == &DataType::Boolean) {
        return Err(PipelineError::DataError(format!(
            "Predictor '{}' is not numeric ({})",
            col_name, dtype
        )));
    }
    if column.null_count() > 0 {
        return Err(PipelineError::DataError(format!(
            "Predictor '{}' has {} missing values",
            col_name,
            column.null_count()
        )));
    }

    let as_f64 = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::DataError(format!("{}: {}", col_name, e)))?;
    Ok(as_f64.f64()?.into_no_null_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let df = df!(
            "a" => &[1i64, 2, 3],
            "flag" => &[true, false, true],
            "y" => &[0i64, 1, 0]
        )
        .unwrap();

        let cols = feature_columns(&df, "y");
        assert_eq!(cols, vec!["a".to_string(), "flag".to_string()]);

        let x = columns_to_array2(&df, &cols).unwrap();
        assert_eq!(x.shape(), &[3, 2]);
        assert_eq!(x[[1, 0]], 2.0);
        assert_eq!(x[[0, 1]], 1.0);
        assert_eq!(x[[1, 1]], 0.0);
    }

    #[test]
    fn test_target_truncated() {
        let df = df!("Survived" => &[0.0f64, 1.0, 1.7]).unwrap();
        let y = target_to_array1(&df, "Survived").unwrap();
        assert_eq!(y.to_vec(), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_text_predictor_rejected() {
        let df = df!("Sex" => &["male", "female"]).unwrap();
        let err = columns_to_array2(&df, &["Sex".to_string()]).unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_null_predictor_rejected() {
        let df = df!("Age" => &[Some(22.0f64), None]).unwrap();
        assert!(columns_to_array2(&df, &["Age".to_string()]).is_err());
    }

    #[test]
    fn test_missing_column() {
        let df = df!("a" => &[1i64]).unwrap();
        assert!(matches!(
            target_to_array1(&df, "Survived"),
            Err(PipelineError::FeatureNotFound(_))
        ));
    }
}
