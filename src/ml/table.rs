//! Typed tabular data for model training and inference
//!
//! A [`FeatureTable`] carries an explicit [`Schema`]; column kinds are fixed
//! when the table is built and never re-inferred from cell values.

use crate::error::{MetricsError, Result};
use crate::types::RawRow;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// How a column is encoded before it reaches a classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Categorical,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered list of (name, kind) pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn from_pairs(pairs: &[(&str, ColumnKind)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(name, kind)| Column {
                    name: name.to_string(),
                    kind: *kind,
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Positions of columns of the given kind, in schema order
    pub fn indices_of_kind(&self, kind: ColumnKind) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == kind)
            .map(|(i, _)| i)
            .collect()
    }

    /// Copy of the schema with one column removed
    pub fn without(&self, name: &str) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
        )
    }
}

/// A single non-missing value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Numeric(f64),
    Categorical(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Numeric(v) => Some(*v),
            Cell::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Categorical(s) => Some(s),
            Cell::Numeric(_) => None,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Cell::Numeric(_) => ColumnKind::Numeric,
            Cell::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Numeric(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
            Cell::Categorical(s) => Value::String(s.clone()),
        }
    }
}

/// Parse one JSON value into a cell of the given kind
///
/// `Ok(None)` means the value is missing. Numeric columns accept numbers and
/// numeric strings; anything else is a schema mismatch.
pub fn parse_cell(column: &str, kind: ColumnKind, value: Option<&Value>) -> Result<Option<Cell>> {
    let value = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    match kind {
        ColumnKind::Numeric => match value {
            Value::Number(n) => Ok(n.as_f64().filter(|v| v.is_finite()).map(Cell::Numeric)),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(Cell::Numeric(v))),
                Ok(_) => Ok(None),
                Err(_) => Err(MetricsError::invalid_input(format!(
                    "Column '{}' expects numeric values, got '{}'",
                    column, s
                ))),
            },
            other => Err(MetricsError::invalid_input(format!(
                "Column '{}' expects numeric values, got {}",
                column, other
            ))),
        },
        ColumnKind::Categorical => match value {
            Value::String(s) => Ok(Some(Cell::Categorical(s.clone()))),
            Value::Number(n) => Ok(Some(Cell::Categorical(n.to_string()))),
            Value::Bool(b) => Ok(Some(Cell::Categorical(b.to_string()))),
            other => Err(MetricsError::invalid_input(format!(
                "Column '{}' expects categorical values, got {}",
                column, other
            ))),
        },
    }
}

/// Rows of fully populated cells under a fixed schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    schema: Schema,
    rows: Vec<Vec<Cell>>,
}

impl FeatureTable {
    pub fn new(schema: Schema, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(MetricsError::invalid_input(format!(
                    "Row {} has {} values, schema has {} columns",
                    i,
                    row.len(),
                    schema.len()
                )));
            }
            for (cell, column) in row.iter().zip(schema.columns()) {
                if cell.kind() != column.kind {
                    return Err(MetricsError::invalid_input(format!(
                        "Row {} has a {:?} value in {:?} column '{}'",
                        i,
                        cell.kind(),
                        column.kind,
                        column.name
                    )));
                }
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Build a table from records that must carry every schema column
    pub fn from_records(schema: &Schema, records: &[RawRow]) -> Result<Self> {
        let mut rows = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let mut row = Vec::with_capacity(schema.len());
            for column in schema.columns() {
                let cell = parse_cell(&column.name, column.kind, record.get(&column.name))?
                    .ok_or_else(|| {
                        MetricsError::invalid_input(format!(
                            "Row {} is missing a value for '{}'",
                            i, column.name
                        ))
                    })?;
                row.push(cell);
            }
            rows.push(row);
        }
        Ok(Self {
            schema: schema.clone(),
            rows,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows at `indices`, in that order
    pub fn take_rows(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            schema: self.schema.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Detach a categorical label column from the features
    pub fn split_label(&self, label: &str) -> Result<(FeatureTable, Vec<String>)> {
        let idx = self.schema.index_of(label).ok_or_else(|| {
            MetricsError::invalid_input(format!("Label column '{}' not found", label))
        })?;
        if self.schema.columns()[idx].kind != ColumnKind::Categorical {
            return Err(MetricsError::invalid_input(format!(
                "Label column '{}' must be categorical",
                label
            )));
        }

        let mut labels = Vec::with_capacity(self.rows.len());
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut row = row.clone();
            match row.remove(idx) {
                Cell::Categorical(s) => labels.push(s),
                Cell::Numeric(v) => labels.push(v.to_string()),
            }
            rows.push(row);
        }

        Ok((
            FeatureTable {
                schema: self.schema.without(label),
                rows,
            },
            labels,
        ))
    }

    /// Reorder columns to match `schema` by name
    pub fn project(&self, schema: &Schema) -> Result<FeatureTable> {
        if &self.schema == schema {
            return Ok(self.clone());
        }

        let mut positions = Vec::with_capacity(schema.len());
        for column in schema.columns() {
            let idx = self.schema.index_of(&column.name).ok_or_else(|| {
                MetricsError::invalid_input(format!("Missing required column '{}'", column.name))
            })?;
            if self.schema.columns()[idx].kind != column.kind {
                return Err(MetricsError::invalid_input(format!(
                    "Column '{}' has kind {:?}, expected {:?}",
                    column.name,
                    self.schema.columns()[idx].kind,
                    column.kind
                )));
            }
            positions.push(idx);
        }

        Ok(FeatureTable {
            schema: schema.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Records in `column → value` form, for JSON responses
    pub fn to_records(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .map(|row| {
                self.schema
                    .columns()
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.name.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }
}
