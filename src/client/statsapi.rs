//! MLB Stats API client
//!
//! Resolves player names to ids and fetches the general stats record.

use crate::error::{MetricsError, Result};
use crate::types::{PlayerGeneralMetrics, StatGroup, TimelineType};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const STAT_GROUPS: &str = "hitting,pitching,fielding";

#[derive(Clone)]
pub struct StatsApiClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeopleResponse {
    #[serde(default)]
    pub people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Person {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub use_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub current_team: Option<Named>,
    #[serde(default)]
    pub primary_position: Option<Position>,
    #[serde(default)]
    pub nick_name: Option<String>,
    #[serde(default)]
    pub last_played_date: Option<String>,
    #[serde(default)]
    pub mlb_debut_date: Option<String>,
    #[serde(default)]
    pub bat_side: Option<Described>,
    #[serde(default)]
    pub pitch_hand: Option<Described>,
    #[serde(default)]
    pub stats: Vec<PersonStats>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Named {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Position {
    #[serde(default)]
    pub abbreviation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Described {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DisplayName {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PersonStats {
    #[serde(rename = "type")]
    pub stat_type: DisplayName,
    pub group: DisplayName,
    #[serde(default)]
    pub splits: Vec<StatSplit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatSplit {
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub stat: Map<String, Value>,
}

impl StatsApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up a player id by name
    pub async fn player_id(&self, last_name: &str, first_name: &str, player_num: usize) -> Result<i64> {
        let url = format!("{}/api/v1/people/search", self.base_url);
        let names = format!("{} {}", first_name, last_name);
        debug!("Searching Stats API for {}", names);

        let resp: PeopleResponse = self
            .http
            .get(&url)
            .query(&[("names", names.as_str()), ("sportIds", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        select_player(&resp.people, last_name, first_name, player_num).ok_or_else(|| {
            MetricsError::NotFound(
                "Player ID lookup failed. No player found with the given name.".to_string(),
            )
        })
    }

    /// Fetch the general stats record for a player
    pub async fn player_stat_data(
        &self,
        player_id: i64,
        timeline: TimelineType,
    ) -> Result<PlayerGeneralMetrics> {
        let url = format!("{}/api/v1/people/{}", self.base_url, player_id);
        let hydrate = format!(
            "currentTeam,stats(group=[{}],type=[{}])",
            STAT_GROUPS,
            timeline.as_str()
        );
        debug!("Fetching {} stats for player {}", timeline.as_str(), player_id);

        let resp = self
            .http
            .get(&url)
            .query(&[("hydrate", hydrate.as_str())])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(player_not_found(player_id));
        }
        let body: PeopleResponse = resp.error_for_status()?.json().await?;

        body.people
            .into_iter()
            .next()
            .map(to_general_metrics)
            .ok_or_else(|| player_not_found(player_id))
    }
}

fn player_not_found(player_id: i64) -> MetricsError {
    MetricsError::NotFound(format!("No player found with id {}", player_id))
}

/// Pick the `player_num`-th exact name match, keeping provider order
pub(crate) fn select_player(
    people: &[Person],
    last_name: &str,
    first_name: &str,
    player_num: usize,
) -> Option<i64> {
    people
        .iter()
        .filter(|p| {
            p.last_name.eq_ignore_ascii_case(last_name.trim())
                && (p.first_name.eq_ignore_ascii_case(first_name.trim())
                    || p.use_name
                        .as_deref()
                        .is_some_and(|n| n.eq_ignore_ascii_case(first_name.trim())))
        })
        .nth(player_num)
        .map(|p| p.id)
}

pub(crate) fn to_general_metrics(person: Person) -> PlayerGeneralMetrics {
    let stats = person
        .stats
        .into_iter()
        .flat_map(|block| {
            let stat_type = block.stat_type.display_name;
            let group = block.group.display_name;
            block.splits.into_iter().map(move |split| StatGroup {
                stat_type: stat_type.clone(),
                group: group.clone(),
                season: split.season,
                stats: split.stat,
            })
        })
        .collect();

    PlayerGeneralMetrics {
        id: person.id,
        first_name: person.use_name.unwrap_or(person.first_name),
        last_name: person.last_name,
        active: person.active,
        current_team: person.current_team.map(|t| t.name).unwrap_or_default(),
        position: person
            .primary_position
            .map(|p| p.abbreviation)
            .unwrap_or_default(),
        nickname: person.nick_name,
        last_played: person.last_played_date,
        mlb_debut: person.mlb_debut_date,
        bat_side: person.bat_side.map(|s| s.description).unwrap_or_default(),
        pitch_hand: person.pitch_hand.map(|s| s.description).unwrap_or_default(),
        stats,
    }
}
