//! Baseball Savant client for Statcast pitch-level data

use crate::error::Result;
use crate::types::{MetricType, RawRow};
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::{Number, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct SavantClient {
    http: Client,
    base_url: String,
}

impl SavantClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Pitch-by-pitch events for one player over an inclusive date range
    pub async fn statcast(
        &self,
        player_id: i64,
        metric_type: MetricType,
        start_dt: NaiveDate,
        end_dt: NaiveDate,
    ) -> Result<Vec<RawRow>> {
        let url = format!("{}/statcast_search/csv", self.base_url);
        let lookup_key = format!("{}s_lookup[]", metric_type.player_type());
        let player = player_id.to_string();
        let start = start_dt.format("%Y-%m-%d").to_string();
        let end = end_dt.format("%Y-%m-%d").to_string();
        debug!(
            "Fetching Statcast {} data for {} from {} to {}",
            metric_type, player_id, start, end
        );

        let text = self
            .http
            .get(&url)
            .query(&[
                ("all", "true"),
                ("type", "details"),
                ("player_type", metric_type.player_type()),
                (lookup_key.as_str(), player.as_str()),
                ("game_date_gt", start.as_str()),
                ("game_date_lt", end.as_str()),
                ("hfGT", "R|PO|S|"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let rows = parse_statcast_csv(&text)?;
        debug!("Statcast returned {} rows for {}", rows.len(), player_id);
        Ok(rows)
    }
}

/// Convert a Statcast CSV export into JSON rows
///
/// Numeric fields become numbers and empty fields become `null`, matching
/// what a dataframe-to-records conversion would emit.
pub fn parse_statcast_csv(text: &str) -> Result<Vec<RawRow>> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, raw)| (name.clone(), cell_value(raw)))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn cell_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" || raw == "NA" {
        return Value::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(num) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(num);
    }
    Value::String(raw.to_string())
}
