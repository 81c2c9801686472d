//! Model training over the assembled feature matrix.
//!
//! - **[`label`]**: category name encoding
//! - **[`linear`]**: softmax classifier and ridge regressor
//! - **[`split`]**: seeded stratified train/test split
//! - **[`metrics`]**: accuracy, per-class report, MSE, R²
//! - **[`trainer`]**: the end-to-end training run producing a [`crate::bundle::ModelBundle`]
pub mod label;
pub mod linear;
pub mod metrics;
pub mod split;
pub mod trainer;

pub use label::LabelEncoder;
pub use linear::{LogisticRegression, RidgeRegressor};
pub use metrics::EvaluationReport;
pub use trainer::train;

use thiserror::Error;

use crate::features::SchemaError;
use crate::vectorizer::VectorizerError;

/// Data-quality and consistency failures that abort a training run.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("cannot train on an empty record set")]
    EmptyDataset,

    #[error("category {category} has {count} records, at least {required} required for a stratified split")]
    CategoryTooSmall {
        category: String,
        count: usize,
        required: usize,
    },

    #[error("record {row}: vulnerability indicator {value} is not numeric")]
    UnencodableIndicator { row: usize, value: String },

    #[error("label {0:?} is not known to the label encoder")]
    UnknownLabel(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Vectorizer(#[from] VectorizerError),
}
