//! External data providers
//!
//! - MLB Stats API: player lookup and general (career/season) metrics
//! - Baseball Savant: per-pitch Statcast events

pub mod savant;
pub mod statsapi;


pub use savant::SavantClient;
pub use statsapi::StatsApiClient;

use crate::config::ProvidersConfig;
use crate::error::Result;
use crate::types::{MetricType, PlayerGeneralMetrics, RawRow, TimelineType};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// Source of player identifiers and statistics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Resolve a player name to an MLBAM id; `player_num` picks among
    /// players sharing the name, in provider order
    async fn player_id(&self, last_name: &str, first_name: &str, player_num: usize) -> Result<i64>;

    async fn player_general_metrics(
        &self,
        player_id: i64,
        timeline: TimelineType,
    ) -> Result<PlayerGeneralMetrics>;

    /// Per-pitch events for the player between `start_dt` and `end_dt`, inclusive
    async fn player_specific_metrics(
        &self,
        player_id: i64,
        metric_type: MetricType,
        start_dt: NaiveDate,
        end_dt: NaiveDate,
    ) -> Result<Vec<RawRow>>;
}

/// Live provider backed by the Stats API and Baseball Savant
#[derive(Clone)]
pub struct MlbDataClient {
    pub stats: StatsApiClient,
    pub savant: SavantClient,
}

impl MlbDataClient {
    pub fn new(config: &ProvidersConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            stats: StatsApiClient::new(&config.stats_api_url, timeout)?,
            savant: SavantClient::new(&config.savant_url, timeout)?,
        })
    }
}

#[async_trait]
impl StatsProvider for MlbDataClient {
    async fn player_id(&self, last_name: &str, first_name: &str, player_num: usize) -> Result<i64> {
        self.stats.player_id(last_name, first_name, player_num).await
    }

    async fn player_general_metrics(
        &self,
        player_id: i64,
        timeline: TimelineType,
    ) -> Result<PlayerGeneralMetrics> {
        self.stats.player_stat_data(player_id, timeline).await
    }

    async fn player_specific_metrics(
        &self,
        player_id: i64,
        metric_type: MetricType,
        start_dt: NaiveDate,
        end_dt: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        self.savant
            .statcast(player_id, metric_type, start_dt, end_dt)
            .await
    }
}
