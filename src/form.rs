use crate::api::ApiClient;
use crate::fixtures::{self, TeamResult};

/// Last-N windows: form letters use a shorter lookback than goal averages.
pub const FORM_WINDOW: u32 = 5;
pub const GOALS_WINDOW: u32 = 10;

/// Sentinel for a team with no qualifying history (new team, provider gap).
pub const NO_FORM: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn classify(result: TeamResult) -> Self {
        if result.goals_for > result.goals_against {
            Outcome::Win
        } else if result.goals_for == result.goals_against {
            Outcome::Draw
        } else {
            Outcome::Loss
        }
    }

    pub fn letter(self) -> char {
        match self {
            Outcome::Win => 'W',
            Outcome::Draw => 'D',
            Outcome::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GoalAverages {
    pub scored: f64,
    pub conceded: f64,
}

/// W/D/L letters in the order the provider returned the matches.
pub fn form_string(results: &[TeamResult]) -> String {
    if results.is_empty() {
        return NO_FORM.to_string();
    }
    results
        .iter()
        .map(|r| Outcome::classify(*r).letter())
        .collect()
}

/// Arithmetic means rounded to 2 decimals. The empty window resolves to
/// zero averages rather than dividing by zero.
pub fn goal_averages(results: &[TeamResult]) -> GoalAverages {
    if results.is_empty() {
        return GoalAverages::default();
    }
    let count = results.len() as f64;
    let scored: u32 = results.iter().map(|r| r.goals_for).sum();
    let conceded: u32 = results.iter().map(|r| r.goals_against).sum();
    GoalAverages {
        scored: round2(scored as f64 / count),
        conceded: round2(conceded as f64 / count),
    }
}

pub fn team_form(api: &ApiClient, team_id: u32) -> String {
    form_string(&fixtures::team_recent_results(api, team_id, FORM_WINDOW))
}

pub fn team_goal_averages(api: &ApiClient, team_id: u32) -> GoalAverages {
    goal_averages(&fixtures::team_recent_results(api, team_id, GOALS_WINDOW))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
