//! Deterministic per-snippet feature derivation.
//!
//! - **[`normalize`]**: comment stripping, whitespace collapse, import canonicalization
//! - **[`keywords`]**: keyword flags + length over the raw snippet
//! - **[`category`]**: ordered rule mapping from free-text label to [`Category`]
//!
//! The numeric columns are laid out by [`FEATURE_COLUMNS`]. Adding, removing or
//! reordering a column requires bumping [`SCHEMA_VERSION`]; bundles trained under
//! another version are rejected at load time.
pub mod category;
pub mod keywords;
pub mod normalize;

pub use category::{Category, categorize, categorize_value};
pub use keywords::{KeywordFeatures, extract};
pub use normalize::normalize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current feature schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Numeric columns in the exact order they follow the text columns.
pub const FEATURE_COLUMNS: [&str; NUMERIC_COLUMNS] = [
    "has_user_input",
    "has_db_operation",
    "has_file_operation",
    "has_eval",
    "code_length",
    "has_validation",
    "has_quotes",
    "has_concatenation",
];

pub const NUMERIC_COLUMNS: usize = 8;

/// Schema consistency failures. Always fatal, never auto-corrected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("numeric feature columns mismatch: expected {expected:?}, found {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("feature schema version mismatch: expected v{expected}, found v{found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("feature row width mismatch: expected {expected} columns, found {found}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("vectorizer vocabulary columns do not match its idf weights")]
    InconsistentVocabulary,

    #[error("class count mismatch: label encoder has {expected} classes, classifier has {found}")]
    ClassMismatch { expected: usize, found: usize },
}

/// Persisted description of the feature layout a model was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub schema_version: u32,
    pub numeric_columns: Vec<String>,
    pub vocabulary_size: usize,
}

impl FeatureSchema {
    /// Schema for the compiled-in column layout with the given text dimensionality.
    #[must_use]
    pub fn current(vocabulary_size: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            numeric_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vocabulary_size,
        }
    }

    /// Total matrix width: text columns followed by the numeric columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.vocabulary_size + self.numeric_columns.len()
    }

    /// Reject any schema that disagrees with the compiled-in layout.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(SchemaError::VersionMismatch {
                expected: SCHEMA_VERSION,
                found: self.schema_version,
            });
        }
        if self.numeric_columns.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
            return Err(SchemaError::ColumnMismatch {
                expected: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
                found: self.numeric_columns.clone(),
            });
        }
        Ok(())
    }

    /// Ensure a row or weight vector has exactly this schema's width.
    pub fn check_width(&self, found: usize) -> Result<(), SchemaError> {
        let expected = self.width();
        if found != expected {
            return Err(SchemaError::WidthMismatch { expected, found });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_count() {
        assert_eq!(FEATURE_COLUMNS.len(), NUMERIC_COLUMNS);
        assert_eq!(FEATURE_COLUMNS[4], "code_length");
    }

    #[test]
    fn test_current_schema_validates() {
        let schema = FeatureSchema::current(500);
        assert!(schema.validate().is_ok());
        assert_eq!(schema.width(), 508);
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let mut schema = FeatureSchema::current(10);
        schema.numeric_columns.swap(0, 1);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_column_rejected() {
        let mut schema = FeatureSchema::current(10);
        schema.numeric_columns.pop();
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("has_concatenation"));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut schema = FeatureSchema::current(10);
        schema.schema_version = SCHEMA_VERSION + 1;
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_check_width() {
        let schema = FeatureSchema::current(3);
        assert!(schema.check_width(11).is_ok());
        assert_eq!(
            schema.check_width(10),
            Err(SchemaError::WidthMismatch {
                expected: 11,
                found: 10
            })
        );
    }
}
