use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::api::ApiClient;

/// A scheduled match as reported by the provider. Immutable once observed;
/// the provider is the source of truth.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub id: u64,
    pub league_id: u32,
    pub league_name: String,
    pub kickoff_utc: String,
    pub home_id: u32,
    pub home_name: String,
    pub away_id: u32,
    pub away_name: String,
}

/// One completed match seen from a single team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamResult {
    pub goals_for: u32,
    pub goals_against: u32,
}

#[derive(Debug, Deserialize)]
struct FixturesPayload {
    #[serde(default)]
    response: Vec<FixtureItem>,
}

#[derive(Debug, Deserialize)]
struct FixtureItem {
    fixture: FixtureCore,
    league: LeagueInfo,
    teams: TeamPair,
    #[serde(default)]
    goals: GoalPair,
}

#[derive(Debug, Deserialize)]
struct FixtureCore {
    id: u64,
    #[serde(default)]
    date: String,
}

#[derive(Debug, Deserialize)]
struct LeagueInfo {
    id: u32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TeamPair {
    home: TeamRef,
    away: TeamRef,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize, Default)]
struct GoalPair {
    #[serde(default)]
    home: Option<u32>,
    #[serde(default)]
    away: Option<u32>,
}

/// Fixtures scheduled on `date` (YYYY-MM-DD) for one league. Any transport
/// or parse failure is logged and yields an empty list; the pipeline treats
/// a league without fixtures as a normal day.
pub fn daily_fixtures(api: &ApiClient, league_id: u32, date: &str) -> Vec<Fixture> {
    let query = [
        ("league", league_id.to_string()),
        ("date", date.to_string()),
    ];
    let Some(payload) = api.get("fixtures", &query) else {
        warn!(league_id, date, "no fixtures payload from provider");
        return Vec::new();
    };
    match parse_fixtures(&payload) {
        Ok(fixtures) => fixtures,
        Err(err) => {
            warn!(league_id, date, error = %err, "malformed fixtures payload");
            Vec::new()
        }
    }
}

/// The team's last `last` completed matches, oriented to that team.
/// Empty on any failure; entries without a recorded score are skipped.
pub fn team_recent_results(api: &ApiClient, team_id: u32, last: u32) -> Vec<TeamResult> {
    let query = [("team", team_id.to_string()), ("last", last.to_string())];
    let Some(payload) = api.get("fixtures", &query) else {
        warn!(team_id, last, "no team history payload from provider");
        return Vec::new();
    };
    match parse_team_results(&payload, team_id) {
        Ok(results) => results,
        Err(err) => {
            warn!(team_id, error = %err, "malformed team history payload");
            Vec::new()
        }
    }
}

pub fn parse_fixtures(payload: &Value) -> Result<Vec<Fixture>> {
    let parsed = FixturesPayload::deserialize(payload).context("invalid fixtures json")?;
    Ok(parsed
        .response
        .into_iter()
        .map(|item| Fixture {
            id: item.fixture.id,
            league_id: item.league.id,
            league_name: item.league.name,
            kickoff_utc: item.fixture.date,
            home_id: item.teams.home.id,
            home_name: item.teams.home.name,
            away_id: item.teams.away.id,
            away_name: item.teams.away.name,
        })
        .collect())
}

/// Provider order is trusted: results come back most-recent-last and are
/// kept as delivered, matching how the form string is assembled.
pub fn parse_team_results(payload: &Value, team_id: u32) -> Result<Vec<TeamResult>> {
    let parsed = FixturesPayload::deserialize(payload).context("invalid team history json")?;
    let mut out = Vec::new();
    for item in parsed.response {
        let (Some(home_goals), Some(away_goals)) = (item.goals.home, item.goals.away) else {
            continue;
        };
        let result = if item.teams.home.id == team_id {
            TeamResult {
                goals_for: home_goals,
                goals_against: away_goals,
            }
        } else {
            TeamResult {
                goals_for: away_goals,
                goals_against: home_goals,
            }
        };
        out.push(result);
    }
    Ok(out)
}
