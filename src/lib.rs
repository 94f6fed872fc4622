//! Titanic survival pipeline
//!
//! Two batch jobs over passenger tables:
//! - Feature derivation: salutation titles, family-structure features and
//!   categorical encoding of the raw passenger CSV
//! - Model training: random-forest grid search with stratified
//!   cross-validation scored by F1, plus a JSON model artifact
//!
//! # Modules
//!
//! - [`preprocessing`] - Feature derivation
//! - [`training`] - Trees, forests, cross-validation, grid search, persistence
//! - [`utils`] - CSV loading and saving
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Jobs
pub mod preprocessing;
pub mod training;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Preprocessing
    pub use crate::preprocessing::{DeriverConfig, DerivationReport, FeatureDeriver, LabelEncoder, Title, TitleExtractor};

    // Training
    pub use crate::training::{
        f1_score, load_model, save_model, Criterion, DecisionTree, ForestParams, GridSearch,
        ParamGrid, RandomForest, StratifiedKFold, Trainer, TrainerConfig, TrainingReport,
    };

    // Utilities
    pub use crate::utils::{DataLoader, DataSaver};
}
