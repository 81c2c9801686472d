/// Evaluation metrics and the training report.
use serde::Serialize;
use tracing::info;

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierMetrics {
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressorMetrics {
    pub mse: f64,
    pub r2: f64,
}

/// Held-out evaluation of both heads. Metrics are `None` when the test
/// partition is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub train_size: usize,
    pub test_size: usize,
    pub classifier: Option<ClassifierMetrics>,
    pub regressor: Option<RegressorMetrics>,
}

impl EvaluationReport {
    pub fn log(&self) {
        info!(
            "Evaluation on {} held-out rows ({} used for training)",
            self.test_size, self.train_size
        );
        match (&self.classifier, &self.regressor) {
            (Some(clf), Some(reg)) => {
                info!("Classifier accuracy: {:.4}", clf.accuracy);
                for c in &clf.per_class {
                    info!(
                        "  {:<16} precision {:.2}  recall {:.2}  f1 {:.2}  support {}",
                        c.label, c.precision, c.recall, c.f1, c.support
                    );
                }
                info!("Regressor MSE: {:.4}, R2: {:.4}", reg.mse, reg.r2);
            }
            _ => info!("Test partition is empty; no held-out metrics computed"),
        }
    }
}

/// Fraction of exact matches. Zero for empty input.
#[must_use]
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    hits as f64 / truth.len() as f64
}

/// Per-class precision/recall/F1 for every class in `classes` (indexed by
/// encoded label). Undefined ratios are reported as 0.
#[must_use]
pub fn classification_report(
    truth: &[usize],
    predicted: &[usize],
    classes: &[String],
) -> Vec<ClassMetrics> {
    classes
        .iter()
        .enumerate()
        .map(|(k, label)| {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            for (&t, &p) in truth.iter().zip(predicted) {
                match (t == k, p == k) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1,
                support: tp + fn_,
            }
        })
        .collect()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[must_use]
pub fn mean_squared_error(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    sum / truth.len() as f64
}

/// Coefficient of determination. With constant targets: 1.0 on a perfect
/// fit, otherwise 0.0.
#[must_use]
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_res: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean) * (t - mean)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
