//! Gradient-boosted regression trees on the multinomial deviance
//!
//! Each stage fits one depth-limited regression tree per class to the
//! residual `y - p`, then replaces the leaf means with a single Newton step.

use super::tree::{grow, SquaredError, Tree, TreeParams};
use super::{
    check_fitted, check_training_input, log_priors, one_hot, softmax_rows, Classifier,
    LabelEncoder,
};
use crate::error::Result;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub seed: u64,
    labels: LabelEncoder,
    baseline: Vec<f64>,
    /// `stages[m][k]` is the tree for class `k` at stage `m`
    stages: Vec<Vec<Tree>>,
    n_features: Option<usize>,
}

impl GradientBoostingClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            seed,
            labels: LabelEncoder::default(),
            baseline: Vec::new(),
            stages: Vec::new(),
            n_features: None,
        }
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Array2<f64> {
        let k = self.baseline.len();
        let mut raw = Array2::from_shape_fn((x.nrows(), k), |(_, c)| self.baseline[c]);
        for stage in &self.stages {
            for (class, tree) in stage.iter().enumerate() {
                for (i, v) in tree.predict_scalar(x).into_iter().enumerate() {
                    raw[[i, class]] += v;
                }
            }
        }
        raw
    }
}

impl Classifier for GradientBoostingClassifier {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[String]) -> Result<()> {
        check_training_input(x, y)?;
        let (labels, encoded) = LabelEncoder::fit(y)?;
        let k = labels.len();
        let n = x.nrows();
        let targets = one_hot(&encoded, k);

        let params = TreeParams {
            max_depth: Some(self.max_depth),
            ..TreeParams::default()
        };
        let newton_factor = (k as f64 - 1.0) / k as f64;
        let lr = self.learning_rate;
        let mut rng = StdRng::seed_from_u64(self.seed);

        self.baseline = log_priors(&encoded, k);
        self.stages.clear();
        let mut raw = Array2::from_shape_fn((n, k), |(_, c)| self.baseline[c]);

        for _ in 0..self.n_estimators {
            let proba = softmax_rows(raw.clone());
            let mut stage = Vec::with_capacity(k);

            for class in 0..k {
                let residual: Vec<f64> = (0..n)
                    .map(|i| targets[[i, class]] - proba[[i, class]])
                    .collect();
                let criterion = SquaredError {
                    targets: &residual,
                };
                let leaf = |samples: &[usize]| {
                    let (num, den) = samples.iter().fold((0.0, 0.0), |(num, den), &i| {
                        let r = residual[i];
                        (num + r, den + r.abs() * (1.0 - r.abs()))
                    });
                    let step = if den.abs() < 1e-150 {
                        0.0
                    } else {
                        newton_factor * num / den
                    };
                    vec![lr * step]
                };

                let tree = grow(x, (0..n).collect(), &criterion, &params, &leaf, &mut rng);
                for (i, v) in tree.predict_scalar(x).into_iter().enumerate() {
                    raw[[i, class]] += v;
                }
                stage.push(tree);
            }
            self.stages.push(stage);
        }

        debug!(
            "Gradient boosting fitted {} stages x {} classes",
            self.stages.len(),
            k
        );
        self.labels = labels;
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn classes(&self) -> &[String] {
        self.labels.classes()
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        check_fitted(self.name(), self.n_features, x)?;
        Ok(softmax_rows(self.raw_scores(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fits_threshold_rule() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0], [9.0]];
        let y: Vec<String> = (0..10)
            .map(|i| if i < 5 { "hit_into_play" } else { "swinging_strike" }.to_string())
            .collect();

        let mut model = GradientBoostingClassifier::new(0);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.score(&x, &y).unwrap(), 1.0);
        let proba = model.predict_proba(&array![[0.5], [8.5]]).unwrap();
        assert!(proba[[0, 0]] > 0.9);
        assert!(proba[[1, 1]] > 0.9);
    }

    #[test]
    fn test_three_classes() {
        let x = array![[0.0], [0.5], [1.0], [5.0], [5.5], [6.0], [10.0], [10.5], [11.0]];
        let y: Vec<String> = ["a", "a", "a", "b", "b", "b", "c", "c", "c"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut model = GradientBoostingClassifier::new(0);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(model.predict(&array![[5.2]]).unwrap(), vec!["b".to_string()]);
    }
}
