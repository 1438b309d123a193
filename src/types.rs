//! Core domain types shared across providers, metrics and the API

use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One raw per-pitch record as delivered by Statcast (column name → value)
pub type RawRow = Map<String, Value>;

/// Which side of the pitch a player's events are fetched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Pitching,
    Batting,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Pitching => "pitching",
            MetricType::Batting => "batting",
        }
    }

    /// Statcast search `player_type` value
    pub fn player_type(&self) -> &'static str {
        match self {
            MetricType::Pitching => "pitcher",
            MetricType::Batting => "batter",
        }
    }
}

impl FromStr for MetricType {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pitching" => Ok(MetricType::Pitching),
            "batting" => Ok(MetricType::Batting),
            _ => Err(MetricsError::invalid_input(
                "Invalid metric_type. Must be either 'pitching' or 'batting'.",
            )),
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of the general stats record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineType {
    #[default]
    Career,
    Season,
}

impl TimelineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineType::Career => "career",
            TimelineType::Season => "season",
        }
    }
}

impl FromStr for TimelineType {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "career" => Ok(TimelineType::Career),
            "season" => Ok(TimelineType::Season),
            _ => Err(MetricsError::invalid_input(
                "Invalid timeline_type. Must be either 'career' or 'season'.",
            )),
        }
    }
}

/// One stats block (e.g. career hitting) of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatGroup {
    #[serde(rename = "type")]
    pub stat_type: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default)]
    pub stats: Map<String, Value>,
}

/// General player record with biographical fields and stats blocks
///
/// Also accepted as a request body, so everything except the debut date is
/// optional on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerGeneralMetrics {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub current_team: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub nickname: Option<String>,
    /// `None` while the player is still active
    #[serde(default)]
    pub last_played: Option<String>,
    #[serde(default)]
    pub mlb_debut: Option<String>,
    #[serde(default)]
    pub bat_side: String,
    #[serde(default)]
    pub pitch_hand: String,
    #[serde(default)]
    pub stats: Vec<StatGroup>,
}

/// First and last MLB appearance, `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerTimeline {
    pub mlb_debut: String,
    pub last_played: String,
}
