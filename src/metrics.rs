//! Derived player metrics
//!
//! Career timeline parsing and the plate-crossing subset of pitch events.

use crate::error::{MetricsError, Result};
use crate::types::{CareerTimeline, PlayerGeneralMetrics, RawRow};
use chrono::{Local, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today" for active players' timelines
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Start and end of a player's career
///
/// A player without `last_played` is still active, so the end date is today.
pub fn parse_career_timeline(
    metrics: &PlayerGeneralMetrics,
    clock: &dyn Clock,
) -> Result<CareerTimeline> {
    let mlb_debut = metrics
        .mlb_debut
        .clone()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| MetricsError::invalid_input("Player metrics are missing mlb_debut"))?;

    let last_played = match metrics.last_played.as_deref() {
        Some(date) if !date.is_empty() => date.to_string(),
        _ => clock.today().format(DATE_FORMAT).to_string(),
    };

    Ok(CareerTimeline {
        mlb_debut,
        last_played,
    })
}

/// Pitches that crossed the plate, i.e. with both `plate_x` and `plate_z`
pub fn plate_crossing_metrics(rows: Vec<RawRow>) -> Vec<RawRow> {
    rows.into_iter()
        .filter(|row| {
            ["plate_x", "plate_z"]
                .iter()
                .all(|key| row.get(*key).is_some_and(|v| !v.is_null()))
        })
        .collect()
}

/// Parse a `YYYY-MM-DD` request parameter
pub fn parse_date(name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        MetricsError::invalid_input(format!(
            "Invalid {}: '{}'. Expected format YYYY-MM-DD.",
            name, value
        ))
    })
}
