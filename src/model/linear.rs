/// Linear heads trained by deterministic full-batch gradient descent.
///
/// Both models see the same layout: TF-IDF columns `0..text_dims` as-is,
/// then the numeric keyword columns divided by their training max-abs.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrainingConfig;
use crate::features::NUMERIC_COLUMNS;
use crate::vectorizer::FeatureRow;

/// Sparse design row over the full width.
type DesignRow = Vec<(usize, f64)>;

/// Per-column max-abs scaling of the numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaxAbsScaler {
    scale: Vec<f64>,
}

impl MaxAbsScaler {
    #[must_use]
    pub fn fit(rows: &[&FeatureRow]) -> Self {
        let mut scale = vec![0.0f64; NUMERIC_COLUMNS];
        for row in rows {
            for (s, v) in scale.iter_mut().zip(row.numeric) {
                *s = s.max(f64::from(v).abs());
            }
        }
        for s in &mut scale {
            if *s == 0.0 {
                *s = 1.0;
            }
        }
        Self { scale }
    }

    fn design_row(&self, row: &FeatureRow, text_dims: usize) -> DesignRow {
        let mut x: DesignRow = row
            .text
            .iter()
            .map(|&(col, v)| (col, f64::from(v)))
            .collect();
        for (j, (v, s)) in row.numeric.iter().zip(&self.scale).enumerate() {
            if *v != 0.0 {
                x.push((text_dims + j, f64::from(*v) / s));
            }
        }
        x
    }
}

/// Largest `1 + |x|²` over the rows; dividing the learning rate by it keeps
/// full-batch descent stable for both losses.
fn lipschitz(design: &[DesignRow]) -> f64 {
    design
        .iter()
        .map(|x| 1.0 + x.iter().map(|(_, v)| v * v).sum::<f64>())
        .fold(1.0, f64::max)
}

fn dot(weights: &[f64], x: &[(usize, f64)]) -> f64 {
    x.iter().map(|&(j, v)| weights[j] * v).sum()
}

/// Multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    text_dims: usize,
    n_classes: usize,
    /// Row-major, one block of `width()` weights per class.
    weights: Vec<f64>,
    bias: Vec<f64>,
    scaler: MaxAbsScaler,
}

impl LogisticRegression {
    /// Fit on `rows` with class indices `labels` in `0..n_classes`.
    #[must_use]
    pub fn fit(
        rows: &[&FeatureRow],
        labels: &[usize],
        n_classes: usize,
        text_dims: usize,
        params: &TrainingConfig,
    ) -> Self {
        let scaler = MaxAbsScaler::fit(rows);
        let design: Vec<DesignRow> = rows.iter().map(|r| scaler.design_row(r, text_dims)).collect();
        let width = text_dims + NUMERIC_COLUMNS;

        let mut model = Self {
            text_dims,
            n_classes,
            weights: vec![0.0; n_classes * width],
            bias: vec![0.0; n_classes],
            scaler,
        };

        let n = design.len().max(1) as f64;
        let step = params.learning_rate / lipschitz(&design);

        for epoch in 0..params.epochs {
            let mut grad_w = vec![0.0; model.weights.len()];
            let mut grad_b = vec![0.0; n_classes];
            let mut loss = 0.0;

            for (x, &y) in design.iter().zip(labels) {
                let p = model.probabilities(x);
                loss -= p[y].max(1e-12).ln();
                for (k, pk) in p.iter().enumerate() {
                    let diff = pk - if k == y { 1.0 } else { 0.0 };
                    grad_b[k] += diff;
                    let block = &mut grad_w[k * width..(k + 1) * width];
                    for &(j, v) in x {
                        block[j] += diff * v;
                    }
                }
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= step * (g / n + params.l2 * *w);
            }
            for (b, g) in model.bias.iter_mut().zip(&grad_b) {
                *b -= step * g / n;
            }

            if epoch % 50 == 0 || epoch + 1 == params.epochs {
                debug!("classifier epoch {epoch}: loss {:.6}", loss / n);
            }
        }

        model
    }

    fn probabilities(&self, x: &[(usize, f64)]) -> Vec<f64> {
        let width = self.width();
        let scores: Vec<f64> = (0..self.n_classes)
            .map(|k| self.bias[k] + dot(&self.weights[k * width..(k + 1) * width], x))
            .collect();
        softmax(&scores)
    }

    /// Class probabilities, indexed by encoded label.
    #[must_use]
    pub fn predict_proba(&self, row: &FeatureRow) -> Vec<f64> {
        self.probabilities(&self.scaler.design_row(row, self.text_dims))
    }

    /// Most probable class; ties go to the lower index.
    #[must_use]
    pub fn predict(&self, row: &FeatureRow) -> usize {
        argmax(&self.predict_proba(row))
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Number of input columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.text_dims + NUMERIC_COLUMNS
    }

    /// Whether the stored parameter vectors agree with the declared shape.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.weights.len() == self.n_classes * self.width()
            && self.bias.len() == self.n_classes
            && self.scaler.scale.len() == NUMERIC_COLUMNS
    }
}

/// Ridge-penalized least squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegressor {
    text_dims: usize,
    weights: Vec<f64>,
    bias: f64,
    scaler: MaxAbsScaler,
}

impl RidgeRegressor {
    #[must_use]
    pub fn fit(
        rows: &[&FeatureRow],
        targets: &[f64],
        text_dims: usize,
        params: &TrainingConfig,
    ) -> Self {
        let scaler = MaxAbsScaler::fit(rows);
        let design: Vec<DesignRow> = rows.iter().map(|r| scaler.design_row(r, text_dims)).collect();
        let n = design.len().max(1) as f64;
        let mean = targets.iter().sum::<f64>() / n;

        let mut model = Self {
            text_dims,
            weights: vec![0.0; text_dims + NUMERIC_COLUMNS],
            bias: mean,
            scaler,
        };
        let step = params.learning_rate / lipschitz(&design);

        for epoch in 0..params.epochs {
            let mut grad_w = vec![0.0; model.weights.len()];
            let mut grad_b = 0.0;
            let mut loss = 0.0;

            for (x, &y) in design.iter().zip(targets) {
                let diff = model.bias + dot(&model.weights, x) - y;
                loss += diff * diff;
                grad_b += diff;
                for &(j, v) in x {
                    grad_w[j] += diff * v;
                }
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= step * (g / n + params.l2 * *w);
            }
            model.bias -= step * grad_b / n;

            if epoch % 50 == 0 || epoch + 1 == params.epochs {
                debug!("regressor epoch {epoch}: mse {:.6}", loss / n);
            }
        }

        model
    }

    #[must_use]
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        let x = self.scaler.design_row(row, self.text_dims);
        self.bias + dot(&self.weights, &x)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.text_dims + NUMERIC_COLUMNS
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.weights.len() == self.width() && self.scaler.scale.len() == NUMERIC_COLUMNS
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value, first one on ties.
#[must_use]
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
        .0
}
