//! Binary decision trees shared by the forest and boosting models
//!
//! Trees are stored as a flat arena. Split search is exact: for every
//! candidate feature the node's samples are sorted once and swept left to
//! right with incremental impurity statistics.

use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf {
        value: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Leaf value reached by `row`; samples with `x <= threshold` go left
    pub fn leaf_value(&self, row: ArrayView1<f64>) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// First component of the leaf value for every row of `x`
    pub fn predict_scalar(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.leaf_value(row)[0])
            .collect()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// Incremental impurity statistics over a set of samples
pub(crate) trait SplitCriterion {
    type Stats: Clone;

    fn empty(&self) -> Self::Stats;
    fn add(&self, stats: &mut Self::Stats, sample: usize);
    fn remove(&self, stats: &mut Self::Stats, sample: usize);

    /// Impurity scaled by sample count, so children can be summed
    fn weighted_impurity(&self, stats: &Self::Stats) -> f64;
}

/// Gini impurity over encoded class labels
pub(crate) struct Gini<'a> {
    pub y: &'a [usize],
    pub n_classes: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct ClassCounts {
    counts: Vec<f64>,
    total: f64,
}

impl SplitCriterion for Gini<'_> {
    type Stats = ClassCounts;

    fn empty(&self) -> ClassCounts {
        ClassCounts {
            counts: vec![0.0; self.n_classes],
            total: 0.0,
        }
    }

    fn add(&self, stats: &mut ClassCounts, sample: usize) {
        stats.counts[self.y[sample]] += 1.0;
        stats.total += 1.0;
    }

    fn remove(&self, stats: &mut ClassCounts, sample: usize) {
        stats.counts[self.y[sample]] -= 1.0;
        stats.total -= 1.0;
    }

    fn weighted_impurity(&self, stats: &ClassCounts) -> f64 {
        if stats.total <= 0.0 {
            return 0.0;
        }
        let sum_sq: f64 = stats.counts.iter().map(|c| c * c).sum();
        stats.total - sum_sq / stats.total
    }
}

/// Squared error around the mean of real-valued targets
pub(crate) struct SquaredError<'a> {
    pub targets: &'a [f64],
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Moments {
    sum: f64,
    sum_sq: f64,
    count: f64,
}

impl SplitCriterion for SquaredError<'_> {
    type Stats = Moments;

    fn empty(&self) -> Moments {
        Moments::default()
    }

    fn add(&self, stats: &mut Moments, sample: usize) {
        let t = self.targets[sample];
        stats.sum += t;
        stats.sum_sq += t * t;
        stats.count += 1.0;
    }

    fn remove(&self, stats: &mut Moments, sample: usize) {
        let t = self.targets[sample];
        stats.sum -= t;
        stats.sum_sq -= t * t;
        stats.count -= 1.0;
    }

    fn weighted_impurity(&self, stats: &Moments) -> f64 {
        if stats.count <= 0.0 {
            return 0.0;
        }
        (stats.sum_sq - stats.sum * stats.sum / stats.count).max(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per node; all features when `None`
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    cost: f64,
}

/// Grow a tree over `samples` (duplicates allowed, e.g. bootstrap draws)
///
/// `leaf` turns the samples reaching a leaf into its stored value.
pub(crate) fn grow<C, L, R>(
    x: &Array2<f64>,
    samples: Vec<usize>,
    criterion: &C,
    params: &TreeParams,
    leaf: &L,
    rng: &mut R,
) -> Tree
where
    C: SplitCriterion,
    L: Fn(&[usize]) -> Vec<f64>,
    R: Rng,
{
    let mut nodes = Vec::new();
    build_node(&mut nodes, x, samples, 0, criterion, params, leaf, rng);
    Tree::from_nodes(nodes)
}

#[allow(clippy::too_many_arguments)]
fn build_node<C, L, R>(
    nodes: &mut Vec<Node>,
    x: &Array2<f64>,
    samples: Vec<usize>,
    depth: usize,
    criterion: &C,
    params: &TreeParams,
    leaf: &L,
    rng: &mut R,
) -> usize
where
    C: SplitCriterion,
    L: Fn(&[usize]) -> Vec<f64>,
    R: Rng,
{
    let idx = nodes.len();
    nodes.push(Node::Leaf { value: Vec::new() });

    let can_split = samples.len() >= params.min_samples_split
        && samples.len() >= 2 * params.min_samples_leaf
        && params.max_depth.map_or(true, |d| depth < d);
    let best = if can_split {
        find_best_split(x, &samples, criterion, params, rng)
    } else {
        None
    };

    let Some(best) = best else {
        nodes[idx] = Node::Leaf {
            value: leaf(&samples),
        };
        return idx;
    };

    let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
        .iter()
        .partition(|&&s| x[[s, best.feature]] <= best.threshold);
    drop(samples);

    let left = build_node(nodes, x, left_samples, depth + 1, criterion, params, leaf, rng);
    let right = build_node(nodes, x, right_samples, depth + 1, criterion, params, leaf, rng);
    nodes[idx] = Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left,
        right,
    };
    idx
}

fn find_best_split<C, R>(
    x: &Array2<f64>,
    samples: &[usize],
    criterion: &C,
    params: &TreeParams,
    rng: &mut R,
) -> Option<BestSplit>
where
    C: SplitCriterion,
    R: Rng,
{
    let mut total = criterion.empty();
    for &s in samples {
        criterion.add(&mut total, s);
    }
    let parent = criterion.weighted_impurity(&total);
    if parent <= 1e-12 {
        return None;
    }

    let mut features: Vec<usize> = (0..x.ncols()).collect();
    if let Some(m) = params.max_features.filter(|&m| m < features.len()) {
        features.shuffle(rng);
        features.truncate(m.max(1));
    }

    let min_leaf = params.min_samples_leaf.max(1);
    let mut best: Option<BestSplit> = None;
    let mut order = samples.to_vec();

    for feature in features {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left = criterion.empty();
        let mut right = total.clone();
        for i in 0..order.len() - 1 {
            criterion.add(&mut left, order[i]);
            criterion.remove(&mut right, order[i]);

            let n_left = i + 1;
            if n_left < min_leaf || order.len() - n_left < min_leaf {
                continue;
            }
            let lo = x[[order[i], feature]];
            let hi = x[[order[i + 1], feature]];
            if hi <= lo {
                continue;
            }

            let cost = criterion.weighted_impurity(&left) + criterion.weighted_impurity(&right);
            let improves = match &best {
                Some(b) => cost < b.cost,
                None => cost < parent - 1e-12,
            };
            if improves {
                let mid = lo + (hi - lo) / 2.0;
                best = Some(BestSplit {
                    feature,
                    threshold: if mid < hi { mid } else { lo },
                    cost,
                });
            }
        }
    }

    best
}
