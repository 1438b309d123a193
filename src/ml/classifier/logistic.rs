//! Multinomial logistic regression with L2 penalty

use super::{check_fitted, check_training_input, one_hot, softmax_rows, Classifier, LabelEncoder};
use crate::error::Result;
use ndarray::{Array1, Array2, Axis};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest gradient component drops below this
    pub tol: f64,
    labels: LabelEncoder,
    weights: Option<Array2<f64>>,
    intercept: Array1<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-4,
            labels: LabelEncoder::default(),
            weights: None,
            intercept: Array1::zeros(0),
        }
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    fn scores(&self, x: &Array2<f64>, weights: &Array2<f64>) -> Array2<f64> {
        x.dot(weights) + &self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[String]) -> Result<()> {
        check_training_input(x, y)?;
        let (labels, encoded) = LabelEncoder::fit(y)?;
        let n = x.nrows() as f64;
        let targets = one_hot(&encoded, labels.len());

        // Objective: mean cross-entropy + ||W||^2 / (2 C n), intercept unpenalized
        let lambda = 1.0 / (self.c * n);
        let mean_sq_norm = x.mapv(|v| v * v).sum() / n;
        let step = 1.0 / (0.5 * (mean_sq_norm + 1.0) + lambda);

        let mut weights = Array2::<f64>::zeros((x.ncols(), labels.len()));
        self.intercept = Array1::zeros(labels.len());

        let mut iterations = 0;
        for _ in 0..self.max_iter {
            iterations += 1;
            let residual = softmax_rows(self.scores(x, &weights)) - &targets;
            let grad_w = x.t().dot(&residual) / n + &weights * lambda;
            let grad_b = residual.sum_axis(Axis(0)) / n;

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0_f64, |m, g| m.max(g.abs()));

            weights.scaled_add(-step, &grad_w);
            self.intercept.scaled_add(-step, &grad_b);

            if max_grad < self.tol {
                break;
            }
        }
        debug!(
            "Logistic regression converged after {} iterations (step {:.4})",
            iterations, step
        );

        self.labels = labels;
        self.weights = Some(weights);
        Ok(())
    }

    fn classes(&self) -> &[String] {
        self.labels.classes()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_fitted(self.name(), self.weights.as_ref().map(|w| w.nrows()), x)?;
        let scores = self
            .weights
            .as_ref()
            .map(|w| self.scores(x, w))
            .unwrap_or_default();
        Ok(softmax_rows(scores))
    }
}
