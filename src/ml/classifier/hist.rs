//! Histogram-based gradient boosting
//!
//! Features are bucketed into at most 255 quantile bins once per fit. Trees
//! grow leaf-wise from per-bin gradient and hessian sums, and each bin edge
//! maps back to a real threshold so fitted trees score raw features.

use super::tree::{Node, Tree};
use super::{
    check_fitted, check_training_input, log_priors, one_hot, softmax_rows, Classifier,
    LabelEncoder,
};
use crate::error::Result;
use ndarray::Array2;
use tracing::debug;

const MIN_HESSIAN_TO_SPLIT: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct HistGradientBoostingClassifier {
    pub max_iter: usize,
    pub learning_rate: f64,
    pub max_leaf_nodes: usize,
    pub min_samples_leaf: usize,
    pub max_bins: usize,
    labels: LabelEncoder,
    baseline: Vec<f64>,
    trees: Vec<Vec<Tree>>,
    n_features: Option<usize>,
}

impl Default for HistGradientBoostingClassifier {
    fn default() -> Self {
        Self {
            max_iter: 100,
            learning_rate: 0.1,
            max_leaf_nodes: 31,
            min_samples_leaf: 20,
            max_bins: 255,
            labels: LabelEncoder::default(),
            baseline: Vec::new(),
            trees: Vec::new(),
            n_features: None,
        }
    }
}

impl HistGradientBoostingClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for HistGradientBoostingClassifier {
    fn name(&self) -> &'static str {
        "hist_gradient_boosting"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &[String]) -> Result<()> {
        check_training_input(x, y)?;
        let (labels, encoded) = LabelEncoder::fit(y)?;
        let k = labels.len();
        let n = x.nrows();
        let targets = one_hot(&encoded, k);

        let binner = Binner::fit(x, self.max_bins.clamp(2, 255));
        let binned = binner.transform(x);

        self.baseline = log_priors(&encoded, k);
        self.trees.clear();
        let mut raw = Array2::from_shape_fn((n, k), |(_, c)| self.baseline[c]);

        for _ in 0..self.max_iter {
            let proba = softmax_rows(raw.clone());
            let mut round = Vec::with_capacity(k);

            for class in 0..k {
                let grad: Vec<f64> = (0..n)
                    .map(|i| proba[[i, class]] - targets[[i, class]])
                    .collect();
                let hess: Vec<f64> = (0..n)
                    .map(|i| {
                        let p = proba[[i, class]];
                        p * (1.0 - p)
                    })
                    .collect();

                let grower = LeafWiseGrower {
                    binner: &binner,
                    binned: &binned,
                    grad: &grad,
                    hess: &hess,
                    max_leaf_nodes: self.max_leaf_nodes.max(2),
                    min_samples_leaf: self.min_samples_leaf.max(1),
                    learning_rate: self.learning_rate,
                };
                let tree = grower.grow(n);
                for (i, v) in tree.predict_scalar(x).into_iter().enumerate() {
                    raw[[i, class]] += v;
                }
                round.push(tree);
            }
            self.trees.push(round);
        }

        debug!(
            "Histogram boosting fitted {} iterations over {} features",
            self.trees.len(),
            x.ncols()
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
        let mut raw = Array2::from_shape_fn((x.nrows(), self.baseline.len()), |(_, c)| {
            self.baseline[c]
        });
        for round in &self.trees {
            for (class, tree) in round.iter().enumerate() {
                for (i, v) in tree.predict_scalar(x).into_iter().enumerate() {
                    raw[[i, class]] += v;
                }
            }
        }
        Ok(softmax_rows(raw))
    }
}

/// Per-feature bin edges; a value lands in the first bin whose edge is >= it
#[derive(Debug, Clone)]
struct Binner {
    edges: Vec<Vec<f64>>,
}

impl Binner {
    fn fit(x: &Array2<f64>, max_bins: usize) -> Self {
        let edges = x
            .columns()
            .into_iter()
            .map(|column| {
                let mut sorted = column.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mut distinct = sorted.clone();
                distinct.dedup();

                if distinct.len() <= max_bins {
                    return distinct
                        .windows(2)
                        .map(|w| w[0] + (w[1] - w[0]) / 2.0)
                        .collect::<Vec<f64>>();
                }

                let last = (sorted.len() - 1) as f64;
                let mut edges: Vec<f64> = (1..max_bins)
                    .map(|q| {
                        let pos = q as f64 * last / max_bins as f64;
                        let lo = sorted[pos.floor() as usize];
                        let hi = sorted[pos.ceil() as usize];
                        lo + (hi - lo) / 2.0
                    })
                    .collect();
                edges.dedup();
                edges
            })
            .collect();
        Self { edges }
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.edges[feature].len() + 1
    }

    fn bin(&self, feature: usize, value: f64) -> u8 {
        self.edges[feature].partition_point(|&edge| edge < value) as u8
    }

    /// Column-major bin codes
    fn transform(&self, x: &Array2<f64>) -> Vec<Vec<u8>> {
        (0..self.edges.len())
            .map(|f| x.column(f).iter().map(|&v| self.bin(f, v)).collect())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    grad: f64,
    hess: f64,
    count: usize,
}

impl BinStats {
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
        self.count += 1;
    }

    fn merge(&mut self, other: &BinStats) {
        self.grad += other.grad;
        self.hess += other.hess;
        self.count += other.count;
    }

    fn minus(&self, other: &BinStats) -> BinStats {
        BinStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }

    fn score(&self) -> f64 {
        self.grad * self.grad / self.hess
    }
}

struct SplitInfo {
    feature: usize,
    bin: u8,
    gain: f64,
}

struct OpenLeaf {
    node: usize,
    samples: Vec<usize>,
    split: Option<SplitInfo>,
}

struct LeafWiseGrower<'a> {
    binner: &'a Binner,
    binned: &'a [Vec<u8>],
    grad: &'a [f64],
    hess: &'a [f64],
    max_leaf_nodes: usize,
    min_samples_leaf: usize,
    learning_rate: f64,
}

impl LeafWiseGrower<'_> {
    /// Repeatedly split the open leaf with the largest gain
    fn grow(&self, n_samples: usize) -> Tree {
        let mut nodes = vec![Node::Leaf { value: Vec::new() }];
        let root: Vec<usize> = (0..n_samples).collect();
        let mut open = vec![OpenLeaf {
            node: 0,
            split: self.find_split(&root),
            samples: root,
        }];

        let mut n_leaves = 1;
        while n_leaves < self.max_leaf_nodes {
            let best = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.split.as_ref().map(|s| (i, s.gain)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            let Some((pos, split)) = best.and_then(|pos| open[pos].split.take().map(|s| (pos, s)))
            else {
                break;
            };
            let leaf = open.swap_remove(pos);

            let codes = &self.binned[split.feature];
            let (left, right): (Vec<usize>, Vec<usize>) =
                leaf.samples.iter().partition(|&&i| codes[i] <= split.bin);

            let left_node = nodes.len();
            let right_node = left_node + 1;
            nodes.push(Node::Leaf { value: Vec::new() });
            nodes.push(Node::Leaf { value: Vec::new() });
            nodes[leaf.node] = Node::Split {
                feature: split.feature,
                threshold: self.binner.edges[split.feature][split.bin as usize],
                left: left_node,
                right: right_node,
            };

            for (node, samples) in [(left_node, left), (right_node, right)] {
                open.push(OpenLeaf {
                    node,
                    split: self.find_split(&samples),
                    samples,
                });
            }
            n_leaves += 1;
        }

        for leaf in open {
            nodes[leaf.node] = Node::Leaf {
                value: vec![self.leaf_value(&leaf.samples)],
            };
        }
        Tree::from_nodes(nodes)
    }

    fn totals(&self, samples: &[usize]) -> BinStats {
        let mut total = BinStats::default();
        for &i in samples {
            total.add(self.grad[i], self.hess[i]);
        }
        total
    }

    fn find_split(&self, samples: &[usize]) -> Option<SplitInfo> {
        let total = self.totals(samples);
        if total.count < 2 * self.min_samples_leaf || total.hess < 2.0 * MIN_HESSIAN_TO_SPLIT {
            return None;
        }
        let parent = total.score();

        let mut best: Option<SplitInfo> = None;
        for (feature, codes) in self.binned.iter().enumerate() {
            let mut histogram = vec![BinStats::default(); self.binner.n_bins(feature)];
            for &i in samples {
                histogram[codes[i] as usize].add(self.grad[i], self.hess[i]);
            }

            let mut left = BinStats::default();
            for (bin, stats) in histogram[..histogram.len() - 1].iter().enumerate() {
                left.merge(stats);
                let right = total.minus(&left);
                if right.count < self.min_samples_leaf {
                    break;
                }
                if left.count < self.min_samples_leaf
                    || left.hess < MIN_HESSIAN_TO_SPLIT
                    || right.hess < MIN_HESSIAN_TO_SPLIT
                {
                    continue;
                }

                let gain = left.score() + right.score() - parent;
                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(SplitInfo {
                        feature,
                        bin: bin as u8,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn leaf_value(&self, samples: &[usize]) -> f64 {
        let total = self.totals(samples);
        if total.hess < 1e-12 {
            0.0
        } else {
            -self.learning_rate * total.grad / total.hess
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_binner_uses_midpoints_for_few_values() {
        let x = array![[1.0], [2.0], [2.0], [4.0]];
        let binner = Binner::fit(&x, 255);

        assert_eq!(binner.edges[0], vec![1.5, 3.0]);
        assert_eq!(binner.transform(&x), vec![vec![0, 1, 1, 2]]);
    }

    #[test]
    fn test_binner_caps_bin_count() {
        let x = Array2::from_shape_fn((1000, 1), |(i, _)| i as f64);
        let binner = Binner::fit(&x, 255);

        assert!(binner.n_bins(0) <= 255);
        let codes = &binner.transform(&x)[0];
        assert!(codes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(codes[0], 0);
    }

    #[test]
    fn test_bin_order_matches_thresholds() {
        let x = Array2::from_shape_fn((600, 1), |(i, _)| ((i * 37) % 600) as f64 / 10.0);
        let binner = Binner::fit(&x, 255);
        for &v in x.column(0).iter() {
            let b = binner.bin(0, v) as usize;
            if b < binner.edges[0].len() {
                assert!(v <= binner.edges[0][b]);
            }
            if b > 0 {
                assert!(v > binner.edges[0][b - 1]);
            }
        }
    }

    #[test]
    fn test_fits_threshold_rule() {
        let x = Array2::from_shape_fn((80, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 7) as f64 });
        let y: Vec<String> = (0..80)
            .map(|i| if i < 40 { "hit_into_play" } else { "swinging_strike" }.to_string())
            .collect();

        let mut model = HistGradientBoostingClassifier::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.score(&x, &y).unwrap(), 1.0);
        let proba = model.predict_proba(&array![[5.0, 3.0], [75.0, 3.0]]).unwrap();
        assert!(proba[[0, 0]] > 0.9);
        assert!(proba[[1, 1]] > 0.9);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_grower_stops_at_max_leaves() {
        let x = Array2::from_shape_fn((200, 1), |(i, _)| i as f64);
        let binner = Binner::fit(&x, 255);
        let binned = binner.transform(&x);
        let grad: Vec<f64> = (0..200)
            .map(|i| [-1.0, 1.0, -0.5, 0.5][i / 50])
            .collect();
        let hess = vec![0.25; 200];

        let grower = LeafWiseGrower {
            binner: &binner,
            binned: &binned,
            grad: &grad,
            hess: &hess,
            max_leaf_nodes: 4,
            min_samples_leaf: 5,
            learning_rate: 0.1,
        };
        let tree = grower.grow(200);

        assert_eq!(tree.n_leaves(), 4);
        let values = tree.predict_scalar(&x);
        assert!(values.iter().all(|v| v.is_finite()));
        assert!(values[0] > 0.0 && values[60] < 0.0);
    }

    #[test]
    fn test_too_few_rows_gives_prior() {
        // Under 2 * min_samples_leaf rows nothing can split
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]];
        let y: Vec<String> = ["a", "a", "b", "b", "b", "b"].iter().map(|s| s.to_string()).collect();

        let mut model = HistGradientBoostingClassifier::new();
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&array![[0.0], [5.0]]).unwrap();

        assert!((proba[[0, 1]] - proba[[1, 1]]).abs() < 1e-12);
        assert!(proba[[0, 1]] > proba[[0, 0]]);
    }
}
