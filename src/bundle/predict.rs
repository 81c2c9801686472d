/// Single-snippet scoring against a loaded bundle.
use std::collections::BTreeMap;

use serde::Serialize;

use super::{BundleError, ModelBundle};
use crate::features::Category;
use crate::model::linear::argmax;
use crate::vectorizer::transform;

/// Result of scoring one snippet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub category: Category,
    /// Probability of `category`, the largest in the distribution.
    pub confidence: f64,
    /// Every taxonomy category; those absent from training score 0.
    pub probability_by_category: BTreeMap<String, f64>,
    /// Output of the regression head.
    pub vulnerability_score: f64,
}

impl ModelBundle {
    /// Score a raw snippet, rebuilding its feature row with this bundle's own
    /// vectorizer. Empty or malformed text is scored like any other snippet.
    ///
    /// Read-only: safe to call concurrently on a shared bundle.
    pub fn predict(&self, snippet: &str) -> Result<Prediction, BundleError> {
        let row = transform(Some(snippet), &self.vectorizer)?;

        let probabilities = self.classifier.predict_proba(&row);
        let mut probability_by_category: BTreeMap<String, f64> = Category::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 0.0))
            .collect();
        for (index, p) in probabilities.iter().enumerate() {
            if let Some(label) = self.label_encoder.decode(index) {
                probability_by_category.insert(label.to_string(), *p);
            }
        }

        let best = argmax(&probabilities);
        let category = self
            .label_encoder
            .decode(best)
            .and_then(|label| label.parse().ok())
            .unwrap_or(Category::Other);

        Ok(Prediction {
            category,
            confidence: probabilities.get(best).copied().unwrap_or(0.0),
            probability_by_category,
            vulnerability_score: self.binary_head.predict(&row),
        })
    }
}
