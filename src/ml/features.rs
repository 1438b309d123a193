//! Feature selection for the swing-outcome model
//!
//! Projects raw Statcast rows onto the fixed pitch schema, keeps only the
//! two modeled outcomes and drops rows with any missing value.

use super::table::{parse_cell, ColumnKind, FeatureTable, Schema};
use crate::error::{MetricsError, Result};
use crate::types::RawRow;
use tracing::debug;

/// Outcome column the classifier predicts
pub const LABEL_COLUMN: &str = "description";

/// Outcomes the model distinguishes
pub const MODELED_OUTCOMES: [&str; 2] = ["hit_into_play", "swinging_strike"];

/// Pitch physics, plate location and outcome
pub const PITCH_COLUMNS: [(&str, ColumnKind); 16] = [
    ("pitch_type", ColumnKind::Categorical),
    ("release_speed", ColumnKind::Numeric),
    ("release_pos_x", ColumnKind::Numeric),
    ("release_pos_y", ColumnKind::Numeric),
    ("release_spin_rate", ColumnKind::Numeric),
    ("spin_axis", ColumnKind::Numeric),
    ("p_throws", ColumnKind::Categorical),
    ("plate_x", ColumnKind::Numeric),
    ("plate_z", ColumnKind::Numeric),
    ("vx0", ColumnKind::Numeric),
    ("vy0", ColumnKind::Numeric),
    ("vz0", ColumnKind::Numeric),
    ("ax", ColumnKind::Numeric),
    ("ay", ColumnKind::Numeric),
    ("az", ColumnKind::Numeric),
    (LABEL_COLUMN, ColumnKind::Categorical),
];

pub fn pitch_schema() -> Schema {
    Schema::from_pairs(&PITCH_COLUMNS)
}

#[derive(Debug, Clone)]
pub struct FeatureSelector {
    schema: Schema,
    label: String,
    outcomes: Vec<String>,
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self::new(
            pitch_schema(),
            LABEL_COLUMN,
            MODELED_OUTCOMES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl FeatureSelector {
    pub fn new(schema: Schema, label: &str, outcomes: Vec<String>) -> Self {
        Self {
            schema,
            label: label.to_string(),
            outcomes,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Select modeled rows, preserving input order
    pub fn select(&self, records: &[RawRow]) -> Result<FeatureTable> {
        if records.is_empty() {
            return Ok(FeatureTable::empty(self.schema.clone()));
        }
        let missing: Vec<&str> = self
            .schema
            .columns()
            .iter()
            .filter(|c| !records.iter().any(|r| r.contains_key(&c.name)))
            .map(|c| c.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(MetricsError::invalid_input(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut rows = Vec::new();
        'records: for record in records {
            let modeled = record
                .get(&self.label)
                .and_then(|v| v.as_str())
                .is_some_and(|d| self.outcomes.iter().any(|o| o == d));
            if !modeled {
                continue;
            }

            let mut row = Vec::with_capacity(self.schema.len());
            for column in self.schema.columns() {
                match parse_cell(&column.name, column.kind, record.get(&column.name))? {
                    Some(cell) => row.push(cell),
                    None => continue 'records,
                }
            }
            rows.push(row);
        }

        debug!(
            "Selected {} of {} rows for outcomes {:?}",
            rows.len(),
            records.len(),
            self.outcomes
        );
        FeatureTable::new(self.schema.clone(), rows)
    }
}
