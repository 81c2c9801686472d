//! # vulnsight: vulnerability snippet classifier
//!
//! Recovers labeled code snippets from an unreliable JSON corpus, derives a
//! fixed feature schema from each snippet, trains a category classifier and a
//! vulnerability regressor over it, and scores new snippets with exactly the
//! feature construction used at training time.
//!
//! ## Architecture
//!
//! - **[`corpus`]**: Fault-tolerant record recovery, failure diagnostics, CSV export
//! - **[`features`]**: Snippet normalization, keyword columns, category taxonomy, schema
//! - **[`vectorizer`]**: TF-IDF vectorizer and feature matrix assembly
//! - **[`model`]**: Label encoding, linear heads, stratified split, metrics, training
//! - **[`bundle`]**: Versioned model bundle, SQLite persistence, inference
//! - **[`config`]**: Configuration loading and validation

pub mod bundle;
pub mod config;
pub mod corpus;
pub mod features;
pub mod model;
pub mod vectorizer;
