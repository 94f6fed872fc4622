//! Feature derivation pipeline
//!
//! The steps run in a fixed order: `Cabin` is dropped before incomplete rows are
//! removed, so its sparsity never discards a passenger.

use crate::error::{PipelineError, Result};
use crate::utils::{DataLoader, DataSaver};
use super::config::DeriverConfig;
use super::encoder::LabelEncoder;
use super::features::DerivedRow;
use super::titles::{Title, TitleExtractor};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

pub const CABIN: &str = "Cabin";
pub const NAME: &str = "Name";
pub const AGE: &str = "Age";
pub const SIBSP: &str = "SibSp";
pub const PARCH: &str = "Parch";
pub const PCLASS: &str = "Pclass";
pub const SEX: &str = "Sex";
pub const EMBARKED: &str = "Embarked";
pub const TITLE: &str = "title";
pub const CLASS: &str = "class";

/// Categorical columns encoded against the values present in the dataset
pub const DATASET_ENCODED_COLUMNS: [&str; 2] = [EMBARKED, SEX];

/// Helper and identifier columns removed from the output
pub const DROPPED_COLUMNS: [&str; 6] = [NAME, PARCH, SIBSP, TITLE, "Ticket", "PassengerId"];

const INTEGER_COLUMNS: [&str; 4] = [PCLASS, AGE, SIBSP, PARCH];

/// Summary of one derivation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_written: usize,
    pub columns: Vec<String>,
    /// Fitted classes per dataset-encoded column, in code order
    pub categorical_classes: BTreeMap<String, Vec<String>>,
    pub duration_secs: f64,
}

/// Derives the passenger feature table
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    extractor: TitleExtractor,
    title_encoder: LabelEncoder,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDeriver {
    /// Create a deriver with the title encoder fitted on the fixed vocabulary
    pub fn new() -> Self {
        let mut title_encoder = LabelEncoder::new(TITLE);
        title_encoder.fit(Title::VOCABULARY.iter().map(Title::as_str));
        Self {
            extractor: TitleExtractor::new(),
            title_encoder,
        }
    }

    /// Read the configured input, derive, and write the configured output
    pub fn run(&self, config: &DeriverConfig) -> Result<DerivationReport> {
        let input_path = config.input_path();
        let output_path = config.output_path();

        info!(path = %input_path.display(), "Reading raw table");
        let df = DataLoader::new()
            .with_infer_schema_length(config.infer_schema_length)
            .load_csv(&input_path)?;

        let (derived, report) = self.derive(&df)?;
        let mut table = capitalized_booleans(&derived)?;

        std::fs::create_dir_all(&config.output_dir)?;
        DataSaver::save_csv(&mut table, &output_path)?;
        info!(
            path = %output_path.display(),
            rows = report.rows_written,
            columns = report.columns.len(),
            "Wrote derived table"
        );

        Ok(report)
    }

    /// Apply every derivation step to an in-memory table
    pub fn derive(&self, df: &DataFrame) -> Result<(DataFrame, DerivationReport)> {
        let start = Instant::now();
        let rows_read = df.height();

        let df = df
            .drop(CABIN)
            .map_err(|_| PipelineError::FeatureNotFound(CABIN.to_string()))?;
        let mut df = drop_incomplete_rows(&df)?;
        let rows_dropped = rows_read - df.height();
        info!(rows_read, rows_dropped, "Dropped incomplete rows");

        let names = string_values(&df, NAME)?;
        let ages = float_values(&df, AGE)?;
        let sibsp = int_values(&df, SIBSP)?;
        let parch = int_values(&df, PARCH)?;

        let titles: Vec<Title> = names
            .par_iter()
            .map(|name| self.extractor.derive_title(name))
            .collect::<Result<Vec<_>>>()?;
        let title_labels: Vec<&str> = titles.iter().map(Title::as_str).collect();
        let encoded_titles = self.title_encoder.transform(&title_labels)?;

        let rows: Vec<DerivedRow> = (0..df.height())
            .into_par_iter()
            .map(|i| DerivedRow::compute(ages[i], sibsp[i], parch[i]))
            .collect();
        debug!(rows = rows.len(), "Computed derived rows");

        let derived_columns = vec![
            Series::new(TITLE.into(), title_labels),
            Series::new("encodedTitle".into(), encoded_titles),
            Series::new(
                "SibSpGroup1".into(),
                rows.iter().map(|r| r.sibsp_groups.group1).collect::<Vec<_>>(),
            ),
            Series::new(
                "SibSpGroup2".into(),
                rows.iter().map(|r| r.sibsp_groups.group2).collect::<Vec<_>>(),
            ),
            Series::new(
                "SibSpGroup3".into(),
                rows.iter().map(|r| r.sibsp_groups.group3).collect::<Vec<_>>(),
            ),
            Series::new("ParChGT2".into(), rows.iter().map(|r| r.parch_gt2).collect::<Vec<_>>()),
            Series::new("familySize".into(), rows.iter().map(|r| r.family_size).collect::<Vec<_>>()),
            Series::new("children".into(), rows.iter().map(|r| r.children).collect::<Vec<_>>()),
            Series::new("parents".into(), rows.iter().map(|r| r.parents).collect::<Vec<_>>()),
            Series::new(
                "responsibleFor".into(),
                rows.iter().map(|r| r.responsible_for).collect::<Vec<_>>(),
            ),
            Series::new(
                "accompaniedBy".into(),
                rows.iter().map(|r| r.accompanied_by).collect::<Vec<_>>(),
            ),
            Series::new(
                "unaccompaniedChild".into(),
                rows.iter().map(|r| r.unaccompanied_child).collect::<Vec<_>>(),
            ),
        ];
        for series in derived_columns {
            df.with_column(series)?;
        }

        for name in INTEGER_COLUMNS {
            let coerced = required_column(&df, name)?
                .as_materialized_series()
                .cast(&DataType::Int64)?;
            df.with_column(coerced)?;
        }

        let mut categorical_classes = BTreeMap::new();
        for name in DATASET_ENCODED_COLUMNS {
            let mut encoder = LabelEncoder::new(name);
            encoder.fit_transform_column(&mut df)?;
            info!(column = name, classes = ?encoder.classes(), "Encoded categorical column");
            categorical_classes.insert(name.to_string(), encoder.classes().to_vec());
        }

        let class = required_column(&df, PCLASS)?
            .as_materialized_series()
            .cast(&DataType::Int64)?
            .with_name(CLASS.into());
        df.with_column(class)?;
        let mut df = df.drop(PCLASS)?;

        for name in DROPPED_COLUMNS {
            df = df
                .drop(name)
                .map_err(|_| PipelineError::FeatureNotFound(name.to_string()))?;
        }

        let report = DerivationReport {
            rows_read,
            rows_dropped,
            rows_written: df.height(),
            columns: df
                .get_column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect(),
            categorical_classes,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        Ok((df, report))
    }
}

/// Keep only rows with a value in every column
pub fn drop_incomplete_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut mask = BooleanChunked::full("complete".into(), true, df.height());
    for col in df.get_columns() {
        let present = col.as_materialized_series().is_not_null();
        mask = &mask & &present;
    }
    Ok(df.filter(&mask)?)
}

/// Boolean columns rendered as `True`/`False` text for the written table
pub fn capitalized_booleans(df: &DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|col| -> Result<Column> {
            if col.dtype() != &DataType::Boolean {
                return Ok(col.clone());
            }
            let text: StringChunked = col
                .bool()?
                .into_iter()
                .map(|v| v.map(|b| if b { "True" } else { "False" }))
                .collect();
            Ok(text.with_name(col.name().clone()).into_series().into())
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| PipelineError::FeatureNotFound(name.to_string()))
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = required_column(df, name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string)
                .ok_or_else(|| PipelineError::PreprocessingError(format!("null in column {}", name)))
        })
        .collect()
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = required_column(df, name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| PipelineError::PreprocessingError(format!("null in column {}", name))))
        .collect()
}

fn int_values(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let series = required_column(df, name)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    series
        .i64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| PipelineError::PreprocessingError(format!("null in column {}", name))))
        .collect()
}
