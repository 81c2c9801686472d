/// The training run: records in, validated [`ModelBundle`] plus evaluation out.
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde_json::Value;
use tracing::info;

use super::linear::{LogisticRegression, RidgeRegressor};
use super::metrics::{
    ClassifierMetrics, EvaluationReport, RegressorMetrics, accuracy, classification_report,
    mean_squared_error, r2_score,
};
use super::split::stratified_split;
use super::{LabelEncoder, TrainError};
use crate::bundle::ModelBundle;
use crate::config::{TrainingConfig, VectorizerConfig};
use crate::corpus::Record;
use crate::features::{Category, categorize};
use crate::vectorizer::{FeatureRow, Vectorizer, fit_transform};

/// Indicator assumed for records without a `vul` field.
pub const DEFAULT_INDICATOR: f64 = 1.0;

/// Train both heads over `records` and evaluate them on a stratified
/// held-out split.
pub fn train(
    records: &[Record],
    training: &TrainingConfig,
    vectorizer_config: &VectorizerConfig,
) -> Result<(ModelBundle, EvaluationReport), TrainError> {
    if records.is_empty() {
        return Err(TrainError::EmptyDataset);
    }

    let categories: Vec<Category> = records
        .par_iter()
        .map(|r| categorize(&r.vulnerability_type))
        .collect();
    check_category_sizes(&categories, training.min_category_size)?;

    let indicators = records
        .iter()
        .map(|r| encode_indicator(r.source_row_index, r.indicator.as_ref()))
        .collect::<Result<Vec<f64>, _>>()?;

    let encoder = LabelEncoder::fit(categories.iter().map(|c| c.as_str()));
    let labels = categories
        .iter()
        .map(|c| encoder.encode(c.as_str()))
        .collect::<Result<Vec<usize>, _>>()?;

    let (matrix, vectorizer) = fit_transform(records, vectorizer_config)?;
    let text_dims = vectorizer.dimensions();

    let split = stratified_split(&labels, training.test_fraction, training.seed);
    info!(
        "Split {} records into {} train / {} test across {} classes",
        records.len(),
        split.train.len(),
        split.test.len(),
        encoder.len()
    );

    let train_rows: Vec<&FeatureRow> = split.train.iter().map(|&i| &matrix.rows[i]).collect();
    let train_labels: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
    let train_targets: Vec<f64> = split.train.iter().map(|&i| indicators[i]).collect();

    info!("Training classifier ({} columns)", matrix.width());
    let classifier =
        LogisticRegression::fit(&train_rows, &train_labels, encoder.len(), text_dims, training);
    info!("Training vulnerability regressor");
    let regressor = RidgeRegressor::fit(&train_rows, &train_targets, text_dims, training);

    let report = evaluate(
        &classifier,
        &regressor,
        &encoder,
        &matrix.rows,
        &split.test,
        &labels,
        &indicators,
        split.train.len(),
    );
    report.log();

    let bundle = ModelBundle::new(classifier, regressor, vectorizer, encoder, matrix.schema)?;
    Ok((bundle, report))
}

fn check_category_sizes(categories: &[Category], required: usize) -> Result<(), TrainError> {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for c in categories {
        *counts.entry(*c).or_insert(0) += 1;
    }
    for (category, count) in counts {
        info!("  {category}: {count} records");
        if count < required {
            return Err(TrainError::CategoryTooSmall {
                category: category.to_string(),
                count,
                required,
            });
        }
    }
    Ok(())
}

/// Convert a raw `vul` value to a regression target.
fn encode_indicator(row: usize, value: Option<&Value>) -> Result<f64, TrainError> {
    let unencodable = |v: &Value| TrainError::UnencodableIndicator {
        row,
        value: v.to_string(),
    };
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_INDICATOR),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(v @ Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| unencodable(v)),
        Some(v @ Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| unencodable(v)),
        Some(v) => Err(unencodable(v)),
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate(
    classifier: &LogisticRegression,
    regressor: &RidgeRegressor,
    encoder: &LabelEncoder,
    rows: &[FeatureRow],
    test: &[usize],
    labels: &[usize],
    indicators: &[f64],
    train_size: usize,
) -> EvaluationReport {
    if test.is_empty() {
        return EvaluationReport {
            train_size,
            test_size: 0,
            classifier: None,
            regressor: None,
        };
    }

    let truth: Vec<usize> = test.iter().map(|&i| labels[i]).collect();
    let predicted: Vec<usize> = test.par_iter().map(|&i| classifier.predict(&rows[i])).collect();
    let targets: Vec<f64> = test.iter().map(|&i| indicators[i]).collect();
    let scores: Vec<f64> = test.par_iter().map(|&i| regressor.predict(&rows[i])).collect();

    EvaluationReport {
        train_size,
        test_size: test.len(),
        classifier: Some(ClassifierMetrics {
            accuracy: accuracy(&truth, &predicted),
            per_class: classification_report(&truth, &predicted, encoder.classes()),
        }),
        regressor: Some(RegressorMetrics {
            mse: mean_squared_error(&targets, &scores),
            r2: r2_score(&targets, &scores),
        }),
    }
}
