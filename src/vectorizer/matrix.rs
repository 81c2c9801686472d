/// Feature matrix assembly: TF-IDF text columns followed by the fixed
/// numeric keyword columns.
///
/// Both [`fit_transform`] and [`transform`] normalize through the same
/// function and finish each row with `assemble`, so a training row and a
/// scoring row for the same snippet are identical given the same fitted
/// vectorizer.
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{SparseVector, TfidfVectorizer, Vectorizer, VectorizerError};
use crate::config::VectorizerConfig;
use crate::corpus::Record;
use crate::features::{FeatureSchema, NUMERIC_COLUMNS, extract, normalize};

/// One feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// TF-IDF weights over the normalized snippet.
    pub text: SparseVector,
    /// Keyword columns in [`crate::features::FEATURE_COLUMNS`] order.
    pub numeric: [f32; NUMERIC_COLUMNS],
}

impl FeatureRow {
    /// Dense representation: `text_dims` text columns, then the numeric columns.
    #[must_use]
    pub fn to_dense(&self, text_dims: usize) -> Vec<f32> {
        let mut dense = vec![0.0; text_dims + NUMERIC_COLUMNS];
        for &(col, v) in &self.text {
            dense[col] = v;
        }
        dense[text_dims..].copy_from_slice(&self.numeric);
        dense
    }
}

/// Rows plus the schema they were assembled under.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.schema.width()
    }
}

/// Fit a vectorizer over every record's normalized snippet and assemble the
/// full matrix.
pub fn fit_transform(
    records: &[Record],
    config: &VectorizerConfig,
) -> Result<(FeatureMatrix, TfidfVectorizer), VectorizerError> {
    let cleaned: Vec<String> = records
        .par_iter()
        .map(|r| normalize(Some(&r.code_snippet)))
        .collect();

    let mut vectorizer = TfidfVectorizer::new(config.clone())?;
    vectorizer.fit(&cleaned)?;

    let texts: Vec<&str> = cleaned.iter().map(String::as_str).collect();
    let rows: Vec<FeatureRow> = vectorizer
        .transform_batch(&texts)?
        .into_iter()
        .zip(records)
        .map(|(text, r)| assemble(Some(&r.code_snippet), text))
        .collect();

    let schema = FeatureSchema::current(vectorizer.dimensions());
    info!(
        "Assembled feature matrix: {} rows x {} columns ({} text + {} numeric)",
        rows.len(),
        schema.width(),
        schema.vocabulary_size,
        NUMERIC_COLUMNS
    );

    Ok((FeatureMatrix { schema, rows }, vectorizer))
}

/// Build the feature row for one raw snippet using an already fitted
/// vectorizer. Absent snippets are scored as empty text with default
/// keyword columns.
pub fn transform(
    snippet: Option<&str>,
    vectorizer: &TfidfVectorizer,
) -> Result<FeatureRow, VectorizerError> {
    let text = vectorizer.transform(&normalize(snippet))?;
    Ok(assemble(snippet, text))
}

/// Append the keyword columns of the raw snippet to its text columns.
fn assemble(snippet: Option<&str>, text: SparseVector) -> FeatureRow {
    let numeric = extract(snippet).unwrap_or_default().values();
    FeatureRow { text, numeric }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(snippet: &str, label: &str, row: usize) -> Record {
        Record {
            code_snippet: snippet.to_string(),
            vulnerability_type: label.to_string(),
            vulnerable_code: None,
            fixed_code: None,
            indicator: None,
            source_row_index: row,
        }
    }

    fn corpus() -> Vec<Record> {
        vec![
            record("db.query(\"SELECT * FROM users WHERE id=\" + id)", "SQL Injection", 1),
            record("res.send(req.query.name) // echo", "XSS", 2),
            record("db.query(userInput)", "SQL Injection", 3),
            record("fs.readFile(req.params.path)", "Path traversal", 4),
        ]
    }

    #[test]
    fn test_train_serve_parity() {
        let records = corpus();
        let (matrix, vectorizer) = fit_transform(&records, &VectorizerConfig::default()).unwrap();
        for (record, row) in records.iter().zip(&matrix.rows) {
            let served = transform(Some(&record.code_snippet), &vectorizer).unwrap();
            assert_eq!(&served, row);
        }
    }

    #[test]
    fn test_matrix_shape() {
        let records = corpus();
        let (matrix, vectorizer) = fit_transform(&records, &VectorizerConfig::default()).unwrap();
        assert_eq!(matrix.n_rows(), 4);
        assert_eq!(matrix.width(), vectorizer.dimensions() + NUMERIC_COLUMNS);
        assert!(matrix.schema.validate().is_ok());
    }

    #[test]
    fn test_numeric_columns_follow_text_columns() {
        let records = corpus();
        let (matrix, vectorizer) = fit_transform(&records, &VectorizerConfig::default()).unwrap();
        let dims = vectorizer.dimensions();
        let dense = matrix.rows[0].to_dense(dims);
        assert_eq!(dense.len(), matrix.width());
        // has_db_operation
        assert_eq!(dense[dims + 1], 1.0);
        // code_length of the raw snippet
        assert_eq!(dense[dims + 4], records[0].code_snippet.chars().count() as f32);
    }

    #[test]
    fn test_absent_snippet_scores_as_empty() {
        let (_, vectorizer) = fit_transform(&corpus(), &VectorizerConfig::default()).unwrap();
        let row = transform(None, &vectorizer).unwrap();
        assert!(row.text.is_empty());
        assert_eq!(row.numeric, [0.0; NUMERIC_COLUMNS]);
    }

    #[test]
    fn test_comment_does_not_change_text_columns() {
        let (_, vectorizer) = fit_transform(&corpus(), &VectorizerConfig::default()).unwrap();
        let a = transform(Some("db.query(userInput)"), &vectorizer).unwrap();
        let b = transform(Some("db.query(userInput) // run it"), &vectorizer).unwrap();
        assert_eq!(a.text, b.text);
        assert_ne!(a.numeric[4], b.numeric[4]);
    }
}
