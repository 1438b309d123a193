//! Stratified train/test splitting
//!
//! Each class contributes to the test set in proportion to its share of the
//! table. Partitioning is driven by a seeded `StdRng`, so a fixed seed always
//! yields the same rows on each side.

use super::table::FeatureTable;
use crate::error::{MetricsError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

pub const DEFAULT_TEST_FRACTION: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 0;

/// Features and labels on both sides of a split, row-aligned
#[derive(Debug, Clone)]
pub struct Split {
    pub train_features: FeatureTable,
    pub test_features: FeatureTable,
    pub train_labels: Vec<String>,
    pub test_labels: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetSplitter {
    test_fraction: f64,
    seed: u64,
}

impl Default for DatasetSplitter {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

impl DatasetSplitter {
    pub fn new(test_fraction: f64, seed: u64) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(MetricsError::invalid_input(format!(
                "test_fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }
        Ok(Self {
            test_fraction,
            seed,
        })
    }

    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Split `table`, stratifying on the values of its `label` column
    pub fn split(&self, table: &FeatureTable, label: &str) -> Result<Split> {
        let (features, labels) = table.split_label(label)?;
        let (train_idx, test_idx) = self.split_indices(&labels)?;

        Ok(Split {
            train_features: features.take_rows(&train_idx),
            test_features: features.take_rows(&test_idx),
            train_labels: train_idx.iter().map(|&i| labels[i].clone()).collect(),
            test_labels: test_idx.iter().map(|&i| labels[i].clone()).collect(),
        })
    }

    /// Row indices for (train, test), stratified on `labels`
    pub fn split_indices(&self, labels: &[String]) -> Result<(Vec<usize>, Vec<usize>)> {
        let n = labels.len();
        if n == 0 {
            return Err(MetricsError::data_quality("No rows available to split"));
        }

        let mut by_class: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            by_class.entry(label.as_str()).or_default().push(i);
        }

        let counts: Vec<usize> = by_class.values().map(|rows| rows.len()).collect();
        let least = counts.iter().copied().min().unwrap_or(0);
        if least < 2 {
            return Err(MetricsError::data_quality(format!(
                "The least populated class has only {} member(s), which is too few to stratify. \
                 Every class needs at least 2 rows.",
                least
            )));
        }

        let n_classes = counts.len();
        let n_test = (self.test_fraction * n as f64).ceil() as usize;
        let n_train = n - n_test;
        if n_test < n_classes || n_train < n_classes {
            return Err(MetricsError::data_quality(format!(
                "Cannot stratify {} rows into {} train / {} test with {} classes",
                n, n_train, n_test, n_classes
            )));
        }

        let test_counts = allocate_test_counts(&counts, n_test);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(n_train);
        let mut test = Vec::with_capacity(n_test);

        for (rows, &t) in by_class.values().zip(&test_counts) {
            let mut rows = rows.clone();
            rows.shuffle(&mut rng);
            test.extend_from_slice(&rows[..t]);
            train.extend_from_slice(&rows[t..]);
        }

        train.shuffle(&mut rng);
        test.shuffle(&mut rng);
        Ok((train, test))
    }
}

/// Per-class test counts summing to `n_test`
///
/// Floors of the proportional shares first, then the remainder goes to the
/// classes with the largest fractional parts. A class always keeps at least
/// one training row.
fn allocate_test_counts(counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let shares: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = shares
        .iter()
        .zip(counts)
        .map(|(s, &c)| (s.floor() as usize).min(c - 1))
        .collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = shares[a] - shares[a].floor();
        let fb = shares[b] - shares[b].floor();
        fb.total_cmp(&fa).then(counts[b].cmp(&counts[a])).then(a.cmp(&b))
    });

    let mut remaining = n_test - alloc.iter().sum::<usize>();
    while remaining > 0 {
        let before = remaining;
        for &class in &order {
            if remaining == 0 {
                break;
            }
            if alloc[class] + 1 < counts[class] {
                alloc[class] += 1;
                remaining -= 1;
            }
        }
        if remaining == before {
            break;
        }
    }
    alloc
}
