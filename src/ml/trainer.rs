//! Train-and-evaluate for the swing-outcome classifier

use super::classifier::ModelType;
use super::features::LABEL_COLUMN;
use super::pipeline::{ModelPipelineBuilder, Pipeline};
use super::split::{DatasetSplitter, DEFAULT_SEED};
use super::table::FeatureTable;
use crate::config::ModelConfig;
use crate::error::{MetricsError, Result};
use serde::Serialize;
use tracing::info;

/// Summary of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub model_type: ModelType,
    /// Accuracy on the held-out split
    pub accuracy: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelTrainerEvaluator {
    splitter: DatasetSplitter,
    seed: u64,
}

impl Default for ModelTrainerEvaluator {
    fn default() -> Self {
        Self {
            splitter: DatasetSplitter::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl ModelTrainerEvaluator {
    pub fn new(splitter: DatasetSplitter, seed: u64) -> Self {
        Self { splitter, seed }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let splitter = DatasetSplitter::new(config.test_fraction, config.seed)?;
        Ok(Self::new(splitter, config.seed))
    }

    pub fn splitter(&self) -> &DatasetSplitter {
        &self.splitter
    }

    /// Split, fit on the training side and score on the held-out side
    pub fn train(
        &self,
        table: &FeatureTable,
        model_type: ModelType,
    ) -> Result<(Pipeline, TrainingReport)> {
        if table.is_empty() {
            return Err(MetricsError::data_quality(
                "No rows with a modeled outcome and complete features to train on",
            ));
        }

        let split = self.splitter.split(table, LABEL_COLUMN)?;
        let mut pipeline = ModelPipelineBuilder::new(split.train_features.schema())
            .build(model_type.build(self.seed));
        pipeline.fit(&split.train_features, &split.train_labels)?;
        let accuracy = pipeline.score(&split.test_features, &split.test_labels)?;

        let report = TrainingReport {
            model_type,
            accuracy,
            train_rows: split.train_labels.len(),
            test_rows: split.test_labels.len(),
            classes: pipeline.classes().to_vec(),
        };
        info!(
            "Trained {} on {} rows, accuracy {:.4} on {} held-out rows",
            model_type, report.train_rows, report.accuracy, report.test_rows
        );
        Ok((pipeline, report))
    }

    /// Same as [`train`](Self::train) with the family given by name
    pub fn train_named(
        &self,
        table: &FeatureTable,
        model_type: &str,
    ) -> Result<(Pipeline, TrainingReport)> {
        self.train(table, model_type.parse()?)
    }
}
