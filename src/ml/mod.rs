//! Swing-outcome classification
//!
//! Raw Statcast rows flow through [`FeatureSelector`] into a typed
//! [`FeatureTable`], are split by [`DatasetSplitter`], fitted through a
//! [`Pipeline`] by [`ModelTrainerEvaluator`] and served from a
//! [`ModelRegistry`] by [`PredictionService`].

pub mod classifier;
pub mod features;
pub mod pipeline;
pub mod predictor;
pub mod registry;
pub mod split;
pub mod table;
pub mod trainer;

#[cfg(test)]
mod tests;

pub use classifier::{Classifier, ModelType};
pub use features::{pitch_schema, FeatureSelector, LABEL_COLUMN, MODELED_OUTCOMES};
pub use pipeline::{ColumnTransformer, ModelPipelineBuilder, Pipeline};
pub use predictor::{predict_with, PredictionResponse, PredictionService};
pub use registry::ModelRegistry;
pub use split::{DatasetSplitter, Split};
pub use table::{Cell, Column, ColumnKind, FeatureTable, Schema};
pub use trainer::{ModelTrainerEvaluator, TrainingReport};
