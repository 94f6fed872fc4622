//! Titanic pipeline - Main Entry Point

use clap::Parser;
use titanic_pipeline::cli::{cmd_predict, cmd_preprocess, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "titanic_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess { data_type, input_dir, output_dir } => {
            cmd_preprocess(&data_type, &input_dir, &output_dir)?;
        }
        Commands::Train { max_leaf_nodes, output_data_dir, model_dir, train, random_state } => {
            cmd_train(max_leaf_nodes, &output_data_dir, &model_dir, &train, random_state)?;
        }
        Commands::Predict { model_dir, data, output } => {
            cmd_predict(&model_dir, &data, output.as_deref())?;
        }
    }

    Ok(())
}
