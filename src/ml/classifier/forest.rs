//! Random forest of bootstrap-sampled Gini trees

use super::tree::{grow, Gini, Tree, TreeParams};
use super::{check_fitted, check_training_input, Classifier, LabelEncoder};
use crate::error::Result;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Bagged Gini trees with per-node feature subsampling
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    pub n_estimators: usize,
    pub seed: u64,
    labels: LabelEncoder,
    trees: Vec<Tree>,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(seed: u64) -> Self {
        Self {
            n_estimators: 100,
            seed,
            labels: LabelEncoder::default(),
            trees: Vec::new(),
            n_features: None,
        }
    }
}

impl Classifier for RandomForestClassifier {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[String]) -> Result<()> {
        check_training_input(x, y)?;
        let (labels, encoded) = LabelEncoder::fit(y)?;
        let n_classes = labels.len();
        let n = x.nrows();

        let params = TreeParams {
            max_features: Some(((x.ncols() as f64).sqrt().floor() as usize).max(1)),
            ..TreeParams::default()
        };
        let criterion = Gini {
            y: &encoded,
            n_classes,
        };
        let leaf = |samples: &[usize]| {
            let mut proportions = vec![0.0; n_classes];
            for &s in samples {
                proportions[encoded[s]] += 1.0;
            }
            let total = samples.len().max(1) as f64;
            proportions.iter_mut().for_each(|p| *p /= total);
            proportions
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        self.trees = (0..self.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                grow(x, bootstrap, &criterion, &params, &leaf, &mut rng)
            })
            .collect();

        debug!(
            "Random forest grew {} trees, {} leaves on average",
            self.trees.len(),
            self.trees.iter().map(|t| t.n_leaves()).sum::<usize>() / self.trees.len().max(1)
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
        let mut proba = Array2::zeros((x.nrows(), self.labels.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for tree in &self.trees {
                for (k, p) in tree.leaf_value(row).iter().enumerate() {
                    proba[[i, k]] += p;
                }
            }
        }
        proba /= self.trees.len().max(1) as f64;
        Ok(proba)
    }
}
