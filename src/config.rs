/// Configuration module for vulnsight.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "vulnsight.json";

// ── Default value functions ──────────────────────────────────────────

fn default_corpus_path() -> String {
    "data/raw/basic_data_3.jsonl".to_string()
}

fn default_bundle_path() -> String {
    "models/bundle.db".to_string()
}

fn default_max_diagnostic_chars() -> usize {
    2000
}

fn default_diagnostic_sample() -> usize {
    5
}

fn default_max_features() -> usize {
    500
}

fn default_min_df() -> usize {
    2
}

fn default_ngram_min() -> usize {
    1
}

fn default_ngram_max() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_min_category_size() -> usize {
    1
}

fn default_epochs() -> usize {
    300
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_l2() -> f64 {
    1e-4
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    #[serde(default = "default_bundle_path")]
    pub bundle_path: String,

    /// Optional CSV export of recovered records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_path: Option<String>,

    #[serde(default)]
    pub recovery: RecoveryConfig,

    #[serde(default)]
    pub vectorizer: VectorizerConfig,

    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecoveryConfig {
    /// Maximum characters of chunk content kept on a failure.
    #[serde(default = "default_max_diagnostic_chars")]
    pub max_diagnostic_chars: usize,

    /// How many failures are logged individually.
    #[serde(default = "default_diagnostic_sample")]
    pub diagnostic_sample: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct VectorizerConfig {
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_min_df")]
    pub min_df: usize,

    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    #[serde(default = "default_true")]
    pub stop_words: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Held-out fraction per category.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Categories with fewer members abort training.
    #[serde(default = "default_min_category_size")]
    pub min_category_size: usize,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "default_l2")]
    pub l2: f64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            bundle_path: default_bundle_path(),
            export_path: None,
            recovery: RecoveryConfig::default(),
            vectorizer: VectorizerConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_diagnostic_chars: default_max_diagnostic_chars(),
            diagnostic_sample: default_diagnostic_sample(),
        }
    }
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            min_df: default_min_df(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            stop_words: default_true(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            min_category_size: default_min_category_size(),
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            l2: default_l2(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// A missing file yields the defaults; a template is written only for the
    /// default path.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in config: {path}"))?;

        info!("Loaded configuration from {path}");
        cfg.validate()
            .with_context(|| format!("invalid configuration in {path}"))?;
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.vectorizer.validate()?;
        self.training.validate()?;
        anyhow::ensure!(
            self.recovery.max_diagnostic_chars > 0,
            "recovery.max_diagnostic_chars must be positive"
        );
        Ok(())
    }
}

impl VectorizerConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.max_features > 0, "vectorizer.max_features must be positive");
        anyhow::ensure!(self.min_df > 0, "vectorizer.min_df must be positive");
        anyhow::ensure!(self.ngram_min > 0, "vectorizer.ngram_min must be positive");
        anyhow::ensure!(
            self.ngram_min <= self.ngram_max,
            "vectorizer.ngram_min must not exceed ngram_max"
        );
        Ok(())
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..1.0).contains(&self.test_fraction),
            "training.test_fraction must be in [0, 1)"
        );
        anyhow::ensure!(self.epochs > 0, "training.epochs must be positive");
        anyhow::ensure!(
            self.learning_rate > 0.0,
            "training.learning_rate must be positive"
        );
        anyhow::ensure!(self.l2 >= 0.0, "training.l2 must not be negative");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.vectorizer.max_features, 500);
        assert_eq!(config.vectorizer.min_df, 2);
        assert_eq!((config.vectorizer.ngram_min, config.vectorizer.ngram_max), (1, 2));
        assert_eq!(config.training.seed, 42);
        assert!((config.training.test_fraction - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.recovery.max_diagnostic_chars, 2000);
        assert!(config.export_path.is_none());
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"bundle_path": "./out.db", "vectorizer": {"max_features": 1000}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.bundle_path, "./out.db");
        assert_eq!(config.vectorizer.max_features, 1000);
        // Other fields should have defaults
        assert_eq!(config.vectorizer.min_df, 2);
        assert_eq!(config.training.epochs, 300);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_test_fraction() {
        let mut config = Config::default();
        config.training.test_fraction = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_ngram_range() {
        let mut config = Config::default();
        config.vectorizer.ngram_min = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_non_default_path_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.vectorizer.max_features, 500);
        assert!(!path.exists(), "template only written for the default path");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"training": {"epochs": 0}}"#).unwrap();
        assert!(Config::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.bundle_path, config.bundle_path);
        assert_eq!(parsed.vectorizer, config.vectorizer);
        assert_eq!(parsed.training, config.training);
    }
}
