//! Preprocessing and model chaining
//!
//! A [`ColumnTransformer`] one-hot encodes categorical columns and
//! standardizes numeric ones; a [`Pipeline`] feeds its output to a
//! [`Classifier`]. Column roles come from the schema, so the encoded width
//! is fixed at fit time and inference tables are projected by name.

use super::classifier::Classifier;
use super::table::{ColumnKind, FeatureTable, Schema};
use crate::error::{MetricsError, Result};
use ndarray::Array2;
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Sorted category list per categorical column
#[derive(Debug, Clone, Default)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(table: &FeatureTable, columns: &[usize]) -> Self {
        let categories = columns
            .iter()
            .map(|&c| {
                table
                    .rows()
                    .iter()
                    .filter_map(|row| row[c].as_str())
                    .map(str::to_string)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        Self { categories }
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Offset of the hot slot for `value` in column `i`; `None` when unseen
    fn slot(&self, i: usize, value: &str) -> Option<usize> {
        self.categories[i]
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }
}

/// Training mean and population standard deviation per numeric column
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Welford running moments; a column whose spread overflows `f64` is rejected
    pub fn fit(table: &FeatureTable, columns: &[usize]) -> Result<Self> {
        let mut mean = Vec::with_capacity(columns.len());
        let mut scale = Vec::with_capacity(columns.len());

        for &c in columns {
            let (mut count, mut m, mut m2) = (0.0, 0.0, 0.0);
            for v in table.rows().iter().filter_map(|r| r[c].as_f64()) {
                count += 1.0;
                let delta = v - m;
                m += delta / count;
                m2 += delta * (v - m);
            }
            let std = (m2 / f64::max(count, 1.0)).sqrt();
            if !m.is_finite() || !std.is_finite() {
                return Err(MetricsError::invalid_input(format!(
                    "Values in column {} are too large to standardize",
                    table.schema().columns()[c].name
                )));
            }
            mean.push(m);
            scale.push(if std > f64::EPSILON { std } else { 1.0 });
        }
        Ok(Self { mean, scale })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    fn apply(&self, i: usize, value: f64) -> f64 {
        (value - self.mean[i]) / self.scale[i]
    }
}

/// Encodes a table into the dense matrix a classifier consumes
///
/// Output layout: one-hot blocks for categorical columns in schema order,
/// then standardized numeric columns in schema order.
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    schema: Schema,
    categorical: Vec<usize>,
    numeric: Vec<usize>,
    encoder: Option<OneHotEncoder>,
    scaler: Option<StandardScaler>,
}

impl ColumnTransformer {
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
            categorical: schema.indices_of_kind(ColumnKind::Categorical),
            numeric: schema.indices_of_kind(ColumnKind::Numeric),
            encoder: None,
            scaler: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_fitted(&self) -> bool {
        self.encoder.is_some() && self.scaler.is_some()
    }

    pub fn output_width(&self) -> Option<usize> {
        self.encoder
            .as_ref()
            .map(|e| e.width() + self.numeric.len())
    }

    pub fn fit(&mut self, table: &FeatureTable) -> Result<()> {
        let table = table.project(&self.schema)?;
        self.encoder = Some(OneHotEncoder::fit(&table, &self.categorical));
        self.scaler = Some(StandardScaler::fit(&table, &self.numeric)?);
        debug!(
            "Column transformer fitted: {} categorical, {} numeric, {} output columns",
            self.categorical.len(),
            self.numeric.len(),
            self.output_width().unwrap_or_default()
        );
        Ok(())
    }

    pub fn transform(&self, table: &FeatureTable) -> Result<Array2<f64>> {
        let (Some(encoder), Some(scaler)) = (&self.encoder, &self.scaler) else {
            return Err(MetricsError::Unexpected(
                "Column transformer has not been fitted".to_string(),
            ));
        };
        let table = table.project(&self.schema)?;
        let one_hot_width = encoder.width();
        let mut out = Array2::zeros((table.len(), one_hot_width + self.numeric.len()));

        for (r, row) in table.rows().iter().enumerate() {
            let mut offset = 0;
            for (i, &c) in self.categorical.iter().enumerate() {
                if let Some(slot) = row[c].as_str().and_then(|v| encoder.slot(i, v)) {
                    out[[r, offset + slot]] = 1.0;
                }
                offset += encoder.categories()[i].len();
            }
            for (i, &c) in self.numeric.iter().enumerate() {
                let value = scaler.apply(i, row[c].as_f64().unwrap_or_default());
                if !value.is_finite() {
                    return Err(MetricsError::invalid_input(format!(
                        "Value in column {} at row {} is out of range",
                        self.schema.columns()[c].name,
                        r
                    )));
                }
                out[[r, one_hot_width + i]] = value;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, table: &FeatureTable) -> Result<Array2<f64>> {
        self.fit(table)?;
        self.transform(table)
    }
}

/// Column transformer chained with a classifier
pub struct Pipeline {
    transformer: ColumnTransformer,
    model: Box<dyn Classifier>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("transformer", &self.transformer)
            .field("model", &self.model.name())
            .finish()
    }
}

impl Pipeline {
    pub fn new(transformer: ColumnTransformer, model: Box<dyn Classifier>) -> Self {
        Self { transformer, model }
    }

    pub fn fit(&mut self, features: &FeatureTable, labels: &[String]) -> Result<()> {
        let x = self.transformer.fit_transform(features)?;
        self.model.fit(&x, labels)
    }

    pub fn predict(&self, features: &FeatureTable) -> Result<Vec<String>> {
        let x = self.transformer.transform(features)?;
        self.model.predict(&x)
    }

    /// Columns follow [`Pipeline::classes`]
    pub fn predict_proba(&self, features: &FeatureTable) -> Result<Array2<f64>> {
        let x = self.transformer.transform(features)?;
        self.model.predict_proba(&x)
    }

    pub fn score(&self, features: &FeatureTable, labels: &[String]) -> Result<f64> {
        let x = self.transformer.transform(features)?;
        self.model.score(&x, labels)
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    /// Schema inference rows are projected onto
    pub fn feature_schema(&self) -> &Schema {
        self.transformer.schema()
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }
}

/// Assembles an unfitted [`Pipeline`] for a feature schema
#[derive(Debug, Clone)]
pub struct ModelPipelineBuilder {
    schema: Schema,
}

impl ModelPipelineBuilder {
    pub fn new(schema: &Schema) -> Self {
        Self {
            schema: schema.clone(),
        }
    }

    pub fn categorical_columns(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Categorical)
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Numeric)
    }

    fn columns_of(&self, kind: ColumnKind) -> Vec<&str> {
        self.schema
            .columns()
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn build(&self, model: Box<dyn Classifier>) -> Pipeline {
        Pipeline::new(ColumnTransformer::new(&self.schema), model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ml::classifier::LogisticRegression;
    use crate::ml::table::Cell;

    fn schema() -> Schema {
        Schema::from_pairs(&[
            ("pitch_type", ColumnKind::Categorical),
            ("release_speed", ColumnKind::Numeric),
            ("p_throws", ColumnKind::Categorical),
            ("plate_x", ColumnKind::Numeric),
        ])
    }

    fn row(pitch_type: &str, speed: f64, hand: &str, plate_x: f64) -> Vec<Cell> {
        vec![
            Cell::Categorical(pitch_type.to_string()),
            Cell::Numeric(speed),
            Cell::Categorical(hand.to_string()),
            Cell::Numeric(plate_x),
        ]
    }

    fn table() -> FeatureTable {
        FeatureTable::new(
            schema(),
            vec![
                row("SL", 85.0, "R", -0.5),
                row("FF", 95.0, "L", 0.5),
                row("FF", 93.0, "R", 0.1),
                row("CU", 79.0, "R", -0.1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_builder_partitions_schema() {
        let builder = ModelPipelineBuilder::new(&schema());
        assert_eq!(builder.categorical_columns(), vec!["pitch_type", "p_throws"]);
        assert_eq!(builder.numeric_columns(), vec!["release_speed", "plate_x"]);
    }

    #[test]
    fn test_transform_layout() {
        let mut transformer = ColumnTransformer::new(&schema());
        let x = transformer.fit_transform(&table()).unwrap();

        // CU FF SL | L R | release_speed plate_x
        assert_eq!(x.ncols(), 7);
        assert_eq!(x.row(0).to_vec()[..5], [0.0, 0.0, 1.0, 0.0, 1.0]);
        assert_eq!(x.row(1).to_vec()[..5], [0.0, 1.0, 0.0, 1.0, 0.0]);

        let speed = x.column(5);
        assert!(speed.sum().abs() < 1e-9);
        let var = speed.mapv(|v| v * v).sum() / 4.0;
        assert!((var - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_category_encodes_as_zeros() {
        let mut transformer = ColumnTransformer::new(&schema());
        transformer.fit(&table()).unwrap();

        let probe = FeatureTable::new(schema(), vec![row("KN", 70.0, "R", 0.0)]).unwrap();
        let x = transformer.transform(&probe).unwrap();
        assert_eq!(x.row(0).to_vec()[..3], [0.0, 0.0, 0.0]);
        assert_eq!(x.row(0)[4], 1.0);
    }

    #[test]
    fn test_constant_column_scales_by_one() {
        let rows = vec![row("FF", 90.0, "R", 0.2), row("SL", 90.0, "R", 0.4)];
        let mut transformer = ColumnTransformer::new(&schema());
        transformer.fit(&FeatureTable::new(schema(), rows).unwrap()).unwrap();

        let scaler = transformer.scaler.as_ref().unwrap();
        assert_eq!(scaler.mean()[0], 90.0);
        assert_eq!(scaler.scale()[0], 1.0);
    }

    #[test]
    fn test_scaler_moments_do_not_overflow() {
        let rows = vec![row("FF", 1e308, "R", 0.2), row("SL", 1e308, "R", 0.4)];
        let mut transformer = ColumnTransformer::new(&schema());
        let x = transformer
            .fit_transform(&FeatureTable::new(schema(), rows).unwrap())
            .unwrap();

        let scaler = transformer.scaler.as_ref().unwrap();
        assert_eq!(scaler.mean()[0], 1e308);
        assert_eq!(scaler.scale()[0], 1.0);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unscalable_column_is_rejected() {
        let rows = vec![row("FF", 1e308, "R", 0.2), row("SL", -1e308, "R", 0.4)];
        let mut transformer = ColumnTransformer::new(&schema());
        let err = transformer
            .fit(&FeatureTable::new(schema(), rows).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!transformer.is_fitted());
    }

    #[test]
    fn test_out_of_range_value_is_rejected_at_transform() {
        let mut transformer = ColumnTransformer::new(&schema());
        transformer.fit(&table()).unwrap();

        let wild = FeatureTable::new(schema(), vec![row("FF", 90.0, "R", 1e308)]).unwrap();
        let err = transformer.transform(&wild).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("plate_x"));
    }

    #[test]
    fn test_reordered_input_is_projected() {
        let mut transformer = ColumnTransformer::new(&schema());
        let table = table();
        let expected = transformer.fit_transform(&table).unwrap();

        let reversed: Vec<_> = schema().columns().iter().rev().cloned().collect();
        let reordered = table.project(&Schema::new(reversed)).unwrap();
        assert_eq!(transformer.transform(&reordered).unwrap(), expected);
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let transformer = ColumnTransformer::new(&schema());
        assert!(transformer.transform(&table()).is_err());
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let labels: Vec<String> = ["swinging_strike", "hit_into_play", "hit_into_play", "swinging_strike"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut pipeline =
            ModelPipelineBuilder::new(&schema()).build(Box::new(LogisticRegression::new()));
        pipeline.fit(&table(), &labels).unwrap();

        assert_eq!(pipeline.model_name(), "logistic_regression");
        assert_eq!(pipeline.classes(), &["hit_into_play", "swinging_strike"]);
        let proba = pipeline.predict_proba(&table()).unwrap();
        assert_eq!(proba.dim(), (4, 2));
        assert_eq!(pipeline.predict(&table()).unwrap().len(), 4);
        assert!((0.0..=1.0).contains(&pipeline.score(&table(), &labels).unwrap()));
    }
}
