//! Inference against registered pipelines

use super::pipeline::Pipeline;
use super::registry::ModelRegistry;
use super::table::FeatureTable;
use crate::error::{MetricsError, Result};
use crate::types::RawRow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Row-aligned predictions; each probability vector follows the model's sorted classes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: Vec<String>,
    pub prediction_probas: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn predict(&self, model_uuid: &str, rows: &[RawRow]) -> Result<PredictionResponse> {
        let pipeline = self.registry.get(model_uuid)?;
        debug!("Predicting {} rows with model {}", rows.len(), model_uuid);
        predict_with(&pipeline, rows)
    }
}

/// Score raw rows with a fitted pipeline
///
/// Rows must carry every feature column; extra keys such as the outcome
/// label are ignored.
pub fn predict_with(pipeline: &Pipeline, rows: &[RawRow]) -> Result<PredictionResponse> {
    let features = FeatureTable::from_records(pipeline.feature_schema(), rows)?;
    let proba = pipeline.predict_proba(&features)?;
    let classes = pipeline.classes();

    let mut prediction = Vec::with_capacity(proba.nrows());
    let mut prediction_probas = Vec::with_capacity(proba.nrows());
    for row in proba.rows() {
        if row.iter().any(|p| !p.is_finite()) {
            return Err(MetricsError::Unexpected(format!(
                "Model {} produced non-finite probabilities",
                pipeline.model_name()
            )));
        }
        let best = row
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |acc, (i, &p)| if p > acc.1 { (i, p) } else { acc })
            .0;
        prediction.push(classes[best].clone());
        prediction_probas.push(row.to_vec());
    }

    Ok(PredictionResponse {
        prediction,
        prediction_probas,
    })
}
