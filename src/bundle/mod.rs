//! The trained model bundle, its SQLite persistence and single-snippet
//! inference.
//!
//! A [`ModelBundle`] can only be built through [`ModelBundle::new`], which
//! checks that the classifier, regressor, vectorizer, label encoder and
//! schema agree with each other. Once built it is immutable and `Send + Sync`,
//! so one loaded bundle can serve concurrent [`ModelBundle::predict`] calls.
pub mod predict;
pub mod store;

pub use predict::Prediction;
pub use store::{load, save};

use std::path::PathBuf;

use thiserror::Error;

use crate::features::{FeatureSchema, SchemaError};
use crate::model::{LabelEncoder, LogisticRegression, RidgeRegressor};
use crate::vectorizer::{TfidfVectorizer, Vectorizer, VectorizerError};

/// Errors raised while persisting, loading or scoring with a bundle.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("model bundle not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("model bundle is missing the {0} artifact")]
    MissingArtifact(String),

    #[error("artifact {artifact} has schema version {found}, expected {expected}")]
    VersionMismatch {
        artifact: String,
        expected: u32,
        found: u32,
    },

    #[error("artifact {artifact} is corrupt: {source}")]
    Corrupt {
        artifact: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize artifact {artifact}: {source}")]
    Encode {
        artifact: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Vectorizer(#[from] VectorizerError),

    #[error("bundle storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("bundle I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fitted vectorizer, label encoder and both heads, versioned as one unit.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    classifier: LogisticRegression,
    binary_head: RidgeRegressor,
    vectorizer: TfidfVectorizer,
    label_encoder: LabelEncoder,
    schema: FeatureSchema,
}

impl ModelBundle {
    /// Assemble a bundle, rejecting any artifact that disagrees with the schema.
    pub fn new(
        classifier: LogisticRegression,
        binary_head: RidgeRegressor,
        vectorizer: TfidfVectorizer,
        label_encoder: LabelEncoder,
        schema: FeatureSchema,
    ) -> Result<Self, SchemaError> {
        schema.validate()?;

        if !vectorizer.is_fitted() || vectorizer.dimensions() != schema.vocabulary_size {
            return Err(SchemaError::WidthMismatch {
                expected: schema.width(),
                found: vectorizer.dimensions() + schema.numeric_columns.len(),
            });
        }
        if !vectorizer.is_consistent() {
            return Err(SchemaError::InconsistentVocabulary);
        }
        schema.check_width(classifier.width())?;
        schema.check_width(binary_head.width())?;
        // Declared width matches; the parameter vectors must match it too.
        if !classifier.is_consistent() || !binary_head.is_consistent() {
            return Err(SchemaError::WidthMismatch {
                expected: schema.width(),
                found: 0,
            });
        }

        if label_encoder.len() != classifier.n_classes() {
            return Err(SchemaError::ClassMismatch {
                expected: label_encoder.len(),
                found: classifier.n_classes(),
            });
        }

        Ok(Self {
            classifier,
            binary_head,
            vectorizer,
            label_encoder,
            schema,
        })
    }

    #[must_use]
    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }

    #[must_use]
    pub fn binary_head(&self) -> &RidgeRegressor {
        &self.binary_head
    }

    #[must_use]
    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    #[must_use]
    pub fn label_encoder(&self) -> &LabelEncoder {
        &self.label_encoder
    }

    #[must_use]
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.schema.schema_version
    }
}
