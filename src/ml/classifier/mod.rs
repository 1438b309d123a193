//! Classifiers for the swing-outcome model
//!
//! All models share the [`Classifier`] trait and operate on the dense
//! matrix produced by the preprocessing stage. Class order is always the
//! sorted set of training labels, which fixes the column order of every
//! probability matrix.

mod boosting;
mod forest;
mod hist;
mod logistic;
mod tree;

pub use boosting::GradientBoostingClassifier;
pub use forest::RandomForestClassifier;
pub use hist::HistGradientBoostingClassifier;
pub use logistic::LogisticRegression;

use crate::error::{MetricsError, Result};
use ndarray::{Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A fit/predict model over dense features
pub trait Classifier: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: &Array2<f64>, y: &[String]) -> Result<()>;

    /// Classes seen during fit, sorted; empty before fit
    fn classes(&self) -> &[String];

    /// One row per sample, one column per class
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<String>> {
        let proba = self.predict_proba(x)?;
        let classes = self.classes();
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc })
                    .0;
                classes[best].clone()
            })
            .collect())
    }

    /// Fraction of exact label matches
    fn score(&self, x: &Array2<f64>, y: &[String]) -> Result<f64> {
        let predicted = self.predict(x)?;
        accuracy(&predicted, y)
    }
}

/// Supported model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
    HistGradientBoosting,
}

impl ModelType {
    pub const ALL: [ModelType; 4] = [
        ModelType::LogisticRegression,
        ModelType::RandomForest,
        ModelType::GradientBoosting,
        ModelType::HistGradientBoosting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::LogisticRegression => "logistic_regression",
            ModelType::RandomForest => "random_forest",
            ModelType::GradientBoosting => "gradient_boosting",
            ModelType::HistGradientBoosting => "hist_gradient_boosting",
        }
    }

    /// Unfitted classifier with default hyperparameters
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match self {
            ModelType::LogisticRegression => Box::new(LogisticRegression::new()),
            ModelType::RandomForest => Box::new(RandomForestClassifier::new(seed)),
            ModelType::GradientBoosting => Box::new(GradientBoostingClassifier::new(seed)),
            ModelType::HistGradientBoosting => Box::new(HistGradientBoostingClassifier::new()),
        }
    }
}

impl FromStr for ModelType {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        ModelType::ALL
            .iter()
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| {
                MetricsError::invalid_input(format!(
                    "invalid model type: '{}'. Expected one of: {}",
                    s,
                    ModelType::ALL.map(|m| m.as_str()).join(", ")
                ))
            })
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraction of positions where `predicted` equals `truth`
pub fn accuracy(predicted: &[String], truth: &[String]) -> Result<f64> {
    if predicted.len() != truth.len() {
        return Err(MetricsError::invalid_input(format!(
            "Got {} predictions for {} labels",
            predicted.len(),
            truth.len()
        )));
    }
    if truth.is_empty() {
        return Err(MetricsError::data_quality("Cannot score an empty set"));
    }
    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / truth.len() as f64)
}

/// Sorted class list plus the index of each label in it
#[derive(Debug, Clone, Default)]
pub(crate) struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit(y: &[String]) -> Result<(Self, Vec<usize>)> {
        let classes: Vec<String> = y
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() < 2 {
            return Err(MetricsError::data_quality(format!(
                "Need at least 2 classes to train a classifier, got {}",
                classes.len()
            )));
        }
        let encoded = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();
        Ok((Self { classes }, encoded))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}

/// Shared shape checks for fit inputs
pub(crate) fn check_training_input(x: &Array2<f64>, y: &[String]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(MetricsError::invalid_input(format!(
            "Feature matrix has {} rows but {} labels were given",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(MetricsError::data_quality("Cannot fit on zero rows"));
    }
    Ok(())
}

/// Shared shape checks for inference inputs
pub(crate) fn check_fitted(name: &str, n_features: Option<usize>, x: &Array2<f64>) -> Result<()> {
    match n_features {
        None => Err(MetricsError::Unexpected(format!("{} has not been fitted", name))),
        Some(n) if n != x.ncols() => Err(MetricsError::invalid_input(format!(
            "{} was fitted on {} features, got {}",
            name,
            n,
            x.ncols()
        ))),
        Some(_) => Ok(()),
    }
}

/// One-hot target matrix for encoded labels
pub(crate) fn one_hot(y: &[usize], n_classes: usize) -> Array2<f64> {
    let mut out = Array2::zeros((y.len(), n_classes));
    for (i, &k) in y.iter().enumerate() {
        out[[i, k]] = 1.0;
    }
    out
}

/// Numerically stable in-place softmax
pub(crate) fn softmax(mut row: ArrayViewMut1<f64>) {
    let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
    row.mapv_inplace(|v| (v - max).exp());
    let sum = row.sum();
    row /= sum;
}

/// Softmax over each row of raw scores
pub(crate) fn softmax_rows(mut scores: Array2<f64>) -> Array2<f64> {
    for row in scores.rows_mut() {
        softmax(row);
    }
    scores
}

/// Log class priors, the starting raw score of the boosting models
pub(crate) fn log_priors(y: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &k in y {
        counts[k] += 1.0;
    }
    let n = y.len() as f64;
    counts
        .into_iter()
        .map(|c| (c / n).max(f64::MIN_POSITIVE).ln())
        .collect()
}
