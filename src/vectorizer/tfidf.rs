/// Bounded-vocabulary TF-IDF vectorizer over normalized snippets.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::tokenizer::analyze;
use super::{SparseVector, Vectorizer, VectorizerError};
use crate::config::VectorizerConfig;

/// Learned vocabulary and inverse document frequencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Fitted {
    /// Term to column, columns assigned in alphabetical term order.
    vocabulary: BTreeMap<String, usize>,
    /// Indexed by column.
    idf: Vec<f32>,
}

/// TF-IDF vectorizer with unigram/bigram terms, `min_df` pruning and a
/// `max_features` cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    fitted: Option<Fitted>,
}

impl TfidfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(config: VectorizerConfig) -> Result<Self, VectorizerError> {
        config
            .validate()
            .map_err(|e| VectorizerError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            config,
            fitted: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Whether every vocabulary column is distinct and has an idf weight.
    /// Always true for a vectorizer fitted in this process; a deserialized one
    /// may not be.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let Some(fitted) = &self.fitted else {
            return true;
        };
        let columns: BTreeSet<usize> = fitted.vocabulary.values().copied().collect();
        fitted.idf.len() == fitted.vocabulary.len()
            && columns.len() == fitted.vocabulary.len()
            && columns.iter().all(|&col| col < fitted.idf.len())
    }

    /// Learned terms in column order. Empty before fitting.
    #[must_use]
    pub fn terms(&self) -> Vec<&str> {
        self.fitted
            .as_ref()
            .map(|f| f.vocabulary.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Learn vocabulary and idf from `documents`, replacing any earlier fit.
    pub fn fit(&mut self, documents: &[String]) -> Result<(), VectorizerError> {
        let counts: Vec<HashMap<String, usize>> = documents
            .par_iter()
            .map(|doc| self.term_counts(doc))
            .collect();

        // term -> (document frequency, total term frequency)
        let mut stats: HashMap<&str, (usize, usize)> = HashMap::new();
        for doc in &counts {
            for (term, n) in doc {
                let entry = stats.entry(term.as_str()).or_default();
                entry.0 += 1;
                entry.1 += n;
            }
        }

        let mut kept: Vec<(&str, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df >= self.config.min_df)
            .map(|(term, (df, tf))| (term, df, tf))
            .collect();

        if kept.len() > self.config.max_features {
            kept.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
            kept.truncate(self.config.max_features);
        }
        kept.sort_by(|a, b| a.0.cmp(b.0));

        if kept.is_empty() {
            warn!(
                "TF-IDF vocabulary is empty after min_df={} pruning over {} documents; only numeric columns carry signal",
                self.config.min_df,
                documents.len()
            );
        }

        let n_docs = documents.len() as f32;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (i, (term, df, _)) in kept.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), i);
            idf.push(((1.0 + n_docs) / (1.0 + df as f32)).ln() + 1.0);
        }

        debug!("Fitted TF-IDF vocabulary with {} terms", vocabulary.len());
        self.fitted = Some(Fitted { vocabulary, idf });
        Ok(())
    }

    fn term_counts(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for term in analyze(
            text,
            self.config.ngram_min,
            self.config.ngram_max,
            self.config.stop_words,
        ) {
            *counts.entry(term).or_insert(0) += 1;
        }
        counts
    }
}

impl Vectorizer for TfidfVectorizer {
    fn transform(&self, text: &str) -> Result<SparseVector, VectorizerError> {
        let fitted = self.fitted.as_ref().ok_or(VectorizerError::NotFitted)?;

        let mut row: SparseVector = self
            .term_counts(text)
            .into_iter()
            .filter_map(|(term, n)| {
                let col = *fitted.vocabulary.get(&term)?;
                fitted.idf.get(col).map(|idf| (col, n as f32 * idf))
            })
            .collect();
        row.sort_by_key(|(col, _)| *col);

        // L2 normalize
        let norm_sq: f32 = row.iter().map(|(_, v)| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for (_, v) in &mut row {
                *v *= inv;
            }
        }

        Ok(row)
    }

    fn transform_batch(&self, texts: &[&str]) -> Result<Vec<SparseVector>, VectorizerError> {
        texts.par_iter().map(|t| self.transform(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.vocabulary.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_features: usize, min_df: usize) -> VectorizerConfig {
        VectorizerConfig {
            max_features,
            min_df,
            ..VectorizerConfig::default()
        }
    }

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_transform_before_fit() {
        let v = TfidfVectorizer::new(VectorizerConfig::default()).unwrap();
        assert_eq!(v.transform("x"), Err(VectorizerError::NotFitted));
        assert_eq!(v.dimensions(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = TfidfVectorizer::new(config(0, 1)).unwrap_err();
        assert!(matches!(err, VectorizerError::InvalidConfig(_)));
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let mut v = TfidfVectorizer::new(config(500, 2)).unwrap();
        v.fit(&docs(&["query users", "query orders", "eval code"])).unwrap();
        assert_eq!(v.terms(), vec!["query"]);
    }

    #[test]
    fn test_vocabulary_alphabetical() {
        let mut v = TfidfVectorizer::new(config(500, 1)).unwrap();
        v.fit(&docs(&["zeta alpha"])).unwrap();
        assert_eq!(v.terms(), vec!["alpha", "zeta", "zeta alpha"]);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let mut v = TfidfVectorizer::new(VectorizerConfig {
            max_features: 2,
            min_df: 1,
            ngram_max: 1,
            ..VectorizerConfig::default()
        })
        .unwrap();
        v.fit(&docs(&["query query exec", "query eval exec"])).unwrap();
        assert_eq!(v.terms(), vec!["exec", "query"]);
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let mut v = TfidfVectorizer::new(config(500, 1)).unwrap();
        v.fit(&docs(&["db query users", "res send input"])).unwrap();
        let row = v.transform("db query users").unwrap();
        let norm: f32 = row.iter().map(|(_, x)| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(row.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_transform_batch_matches_transform() {
        let mut v = TfidfVectorizer::new(config(500, 1)).unwrap();
        v.fit(&docs(&["db query users", "res send input"])).unwrap();
        let texts = ["send users", "", "db query"];
        let batch = v.transform_batch(&texts).unwrap();
        assert_eq!(batch.len(), texts.len());
        for (text, row) in texts.iter().zip(&batch) {
            assert_eq!(&v.transform(text).unwrap(), row);
        }
    }

    #[test]
    fn test_unknown_terms_yield_empty_row() {
        let mut v = TfidfVectorizer::new(config(500, 1)).unwrap();
        v.fit(&docs(&["db query"])).unwrap();
        assert!(v.transform("completely different").unwrap().is_empty());
        assert!(v.transform("").unwrap().is_empty());
    }

    #[test]
    fn test_empty_vocabulary_allowed() {
        let mut v = TfidfVectorizer::new(config(500, 2)).unwrap();
        v.fit(&docs(&["alpha", "beta"])).unwrap();
        assert!(v.is_fitted());
        assert_eq!(v.dimensions(), 0);
    }

    #[test]
    fn test_inconsistent_vocabulary_detected() {
        let mut v = TfidfVectorizer::new(config(500, 1)).unwrap();
        v.fit(&docs(&["db query users"])).unwrap();
        assert!(v.is_consistent());

        let mut extra_weight = v.clone();
        extra_weight.fitted.as_mut().unwrap().idf.push(1.0);
        assert!(!extra_weight.is_consistent());

        let mut out_of_range = v.clone();
        let fitted = out_of_range.fitted.as_mut().unwrap();
        *fitted.vocabulary.values_mut().next().unwrap() = 99;
        assert!(!out_of_range.is_consistent());
        assert!(out_of_range.transform("db query users").is_ok());
    }

    #[test]
    fn test_serde_roundtrip_preserves_transform() {
        let mut v = TfidfVectorizer::new(config(500, 1)).unwrap();
        v.fit(&docs(&["db query users", "res send input"])).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: TfidfVectorizer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.transform("send users").unwrap(), v.transform("send users").unwrap());
    }
}
