//! Titanic pipeline CLI module
//!
//! Command-line entry points for feature derivation, training and prediction.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::preprocessing::{DeriverConfig, FeatureDeriver};
use crate::training::{load_model, max_leaf_nodes_from_arg, Trainer, TrainerConfig};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "titanic")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Titanic survival feature derivation and model training")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Derive the feature table from a raw passenger table
    Preprocess {
        /// File name stem, e.g. train or test
        #[arg(long = "data_type")]
        data_type: String,

        /// Directory holding <data_type>.csv
        #[arg(long = "input_dir")]
        input_dir: PathBuf,

        /// Directory receiving <data_type>.csv
        #[arg(long = "output_dir")]
        output_dir: PathBuf,
    },

    /// Grid-search a random forest and save the best model
    Train {
        /// Leaf cap per tree, -1 for unlimited
        #[arg(long = "max_leaf_nodes", default_value_t = -1, allow_negative_numbers = true)]
        max_leaf_nodes: i64,

        /// Directory receiving cv_results.csv
        #[arg(long = "output-data-dir", env = "SM_OUTPUT_DATA_DIR")]
        output_data_dir: PathBuf,

        /// Directory receiving model.json
        #[arg(long = "model-dir", env = "SM_MODEL_DIR")]
        model_dir: PathBuf,

        /// Directory holding train.csv
        #[arg(long = "train", env = "SM_CHANNEL_TRAIN")]
        train: PathBuf,

        /// Seed for bootstrap and feature sampling
        #[arg(long = "random-state")]
        random_state: Option<u64>,
    },

    /// Predict survival with a saved model
    Predict {
        /// Directory holding model.json
        #[arg(long = "model-dir", env = "SM_MODEL_DIR")]
        model_dir: PathBuf,

        /// Derived feature table
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(data_type: &str, input_dir: &Path, output_dir: &Path) -> anyhow::Result<()> {
    section("Preprocess");

    let config = DeriverConfig::new(data_type)
        .with_input_dir(input_dir)
        .with_output_dir(output_dir);

    step_run(&format!("Deriving features from {}", config.input_path().display()));
    let report = FeatureDeriver::new().run(&config)?;
    step_done(&format!(
        "{} rows in, {} dropped, {} written in {:.3}s",
        report.rows_read, report.rows_dropped, report.rows_written, report.duration_secs
    ));

    for (column, classes) in &report.categorical_classes {
        println!("  {:<16} {}", muted(column), classes.join(", ").white());
    }
    println!("  {:<16} {}", muted("Output"), config.output_path().display().to_string().white());
    println!();

    Ok(())
}

pub fn cmd_train(
    max_leaf_nodes: i64,
    output_data_dir: &Path,
    model_dir: &Path,
    train_dir: &Path,
    random_state: Option<u64>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = TrainerConfig::new(train_dir, model_dir, output_data_dir)
        .with_max_leaf_nodes(max_leaf_nodes_from_arg(max_leaf_nodes)?);
    if let Some(seed) = random_state {
        config = config.with_random_state(seed);
    }

    step_run(&format!("Grid search on {}", config.train_path().display()));
    let report = Trainer::run(&config)?;
    step_done(&format!("{} rows in {:.3}s", report.n_samples, report.duration_secs));

    println!();
    println!("  {:<8} {:<10} {:>10} {:>10} {:>6}",
        muted("Crit."), muted("Depth"), muted("Mean F1"), muted("Std"), muted("Rank"));
    println!("  {}", dim(&"─".repeat(48)));
    for result in &report.cv_results {
        let depth = result.params.max_depth.map_or("None".to_string(), |d| d.to_string());
        println!("  {:<8} {:<10} {:>10.4} {:>10.4} {:>6}",
            result.params.criterion, depth, result.mean_score, result.std_score, result.rank);
    }
    println!("  {}", dim(&"─".repeat(48)));

    println!();
    println!("  {} {} {} {:.4}",
        ok("best"),
        report.best_params.to_string().white().bold(),
        muted("F1:"),
        report.best_score
    );

    let mut ranked: Vec<(&String, f64)> = report
        .feature_names
        .iter()
        .zip(report.feature_importances.iter().copied())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    if !ranked.is_empty() {
        println!();
        println!("  {}", muted("Top features"));
        for (name, importance) in ranked.iter().take(5) {
            println!("  {:<24} {:>8.4}", name.white(), importance);
        }
    }
    println!();
    println!("  {:<16} {}", muted("Model"), report.model_path.display().to_string().white());
    println!("  {:<16} {}", muted("CV results"), report.cv_results_path.display().to_string().white());
    println!();

    Ok(())
}

pub fn cmd_predict(model_dir: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let start = Instant::now();
    let search = load_model(model_dir)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Predicting");
    let predictions = search.predict_frame(&df)?;
    let survived = predictions.iter().filter(|&&p| p == 1.0).count();
    step_done(&format!("{} of {} predicted to survive", survived, predictions.len()));

    if let Some(path) = output {
        let mut out = DataFrame::new(vec![Series::new(
            "prediction".into(),
            predictions.iter().map(|&p| p as i64).collect::<Vec<_>>(),
        )
        .into()])?;
        DataSaver::save_csv(&mut out, path)?;
        println!("  {:<16} {}", muted("Output"), path.display().to_string().white());
    }

    println!();
    Ok(())
}
