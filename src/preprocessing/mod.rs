//! Passenger feature derivation
//!
//! Turns the raw passenger table into a fully numeric feature table:
//! - Salutation extraction and title categories
//! - Family-structure features (sibling bands, children, parents, ratios)
//! - Label encoding of titles (fixed vocabulary) and of `Sex`/`Embarked`
//!   (fitted per dataset)

mod config;
mod encoder;
mod pipeline;
pub mod features;
pub mod titles;

pub use config::DeriverConfig;
pub use encoder::LabelEncoder;
pub use pipeline::{
    drop_incomplete_rows, DerivationReport, FeatureDeriver, DATASET_ENCODED_COLUMNS,
    DROPPED_COLUMNS,
};
pub use features::{
    derive_accompanied_by, derive_children, derive_parents, derive_responsible_for, family_size,
    is_unaccompanied_child, parch_gt2, sibsp_groups, DerivedRow, SibSpGroups,
};
pub use titles::{Title, TitleExtractor};
