//! Model training module
//!
//! Survival classifier training:
//! - CART decision trees and bootstrap-aggregated random forests
//! - Stratified K-fold cross-validation scored by F1
//! - Grid search over criterion and depth, refit of the winner
//! - JSON model artifact

mod config;
mod frame;
mod persistence;
mod trainer;
pub mod cross_validation;
pub mod decision_tree;
pub mod grid_search;
pub mod metrics;
pub mod random_forest;

pub use config::{max_leaf_nodes_from_arg, TrainerConfig};
pub use frame::{columns_to_array2, feature_columns, target_to_array1};
pub use persistence::{load_model, model_path, save_model, MODEL_FILE_NAME};
pub use trainer::{cv_results_frame, Trainer, TrainingReport, CV_RESULTS_FILE_NAME};
pub use cross_validation::{CVResults, CVSplit, StratifiedKFold};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use grid_search::{Candidate, CandidateResult, ForestParams, GridSearch, ParamGrid};
pub use metrics::{f1_score, ClassificationMetrics};
pub use random_forest::RandomForest;
