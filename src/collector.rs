use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::fixtures::{self, Fixture};
use crate::form::{self, GoalAverages};
use crate::odds;
use crate::store::{Database, MatchRecord};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub league_ids: Vec<u32>,
    /// Target day, YYYY-MM-DD.
    pub date: String,
    pub bookmaker_pause: Duration,
    pub fixture_pause: Duration,
}

impl CollectOptions {
    pub fn from_config(config: &Config, date: String) -> Self {
        Self {
            league_ids: config.league_ids.clone(),
            date,
            bookmaker_pause: config.bookmaker_pause,
            fixture_pause: config.fixture_pause,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectSummary {
    pub fixtures_seen: usize,
    pub stored: usize,
    pub already_present: usize,
    pub with_odds: usize,
    pub without_odds: usize,
    pub failures: Vec<String>,
}

struct Collected {
    inserted: bool,
    had_odds: bool,
}

/// One collection run: every configured league, every fixture of the day,
/// strictly sequential. No single league's or fixture's failure stops the
/// rest of the batch; re-running is safe because inserts are idempotent.
pub fn collect_day(
    api: &ApiClient,
    db: &mut Database,
    opts: &CollectOptions,
) -> Result<CollectSummary> {
    let mut summary = CollectSummary::default();
    for league_id in &opts.league_ids {
        let fixtures = fixtures::daily_fixtures(api, *league_id, &opts.date);
        if fixtures.is_empty() {
            info!(league_id, date = %opts.date, "no fixtures for league");
            continue;
        }
        info!(league_id, count = fixtures.len(), "league fixtures found");
        for fixture in &fixtures {
            summary.fixtures_seen += 1;
            match collect_fixture(api, db, fixture, opts) {
                Ok(outcome) => {
                    if outcome.inserted {
                        summary.stored += 1;
                        if outcome.had_odds {
                            summary.with_odds += 1;
                        } else {
                            summary.without_odds += 1;
                        }
                    } else {
                        summary.already_present += 1;
                    }
                }
                Err(err) => {
                    warn!(fixture_id = fixture.id, error = %err, "fixture collection failed");
                    summary
                        .failures
                        .push(format!("fixture {}: {err:#}", fixture.id));
                }
            }
            if !opts.fixture_pause.is_zero() {
                thread::sleep(opts.fixture_pause);
            }
        }
    }
    Ok(summary)
}

fn collect_fixture(
    api: &ApiClient,
    db: &mut Database,
    fixture: &Fixture,
    opts: &CollectOptions,
) -> Result<Collected> {
    info!(
        fixture_id = fixture.id,
        home = %fixture.home_name,
        away = %fixture.away_name,
        "collecting fixture"
    );

    let home_form = form::team_form(api, fixture.home_id);
    let away_form = form::team_form(api, fixture.away_id);
    let home_goals = form::team_goal_averages(api, fixture.home_id);
    let away_goals = form::team_goal_averages(api, fixture.away_id);

    let quote = odds::resolve_fixture_odds(api, fixture.id, opts.bookmaker_pause);
    let had_odds = quote.is_some();
    if !had_odds {
        // Still persisted: absence of odds is a first-class state and the
        // row can pick up analysis later if odds ever arrive out-of-band.
        info!(fixture_id = fixture.id, "no odds available from any bookmaker");
    }

    let record = MatchRecord {
        match_id: fixture.id.to_string(),
        home_team: fixture.home_name.clone(),
        away_team: fixture.away_name.clone(),
        league: fixture.league_name.clone(),
        match_date: fixture.kickoff_utc.clone(),
        context_note: context_note(&home_form, &away_form, home_goals, away_goals, had_odds),
        odds: quote,
        home_form,
        away_form,
        home_goals,
        away_goals,
    };
    let inserted = db.insert_record(&record)?;
    Ok(Collected { inserted, had_odds })
}

/// Free-text annotation summarizing form and goal averages, consumed later
/// by the analysis prompt.
pub fn context_note(
    home_form: &str,
    away_form: &str,
    home_goals: GoalAverages,
    away_goals: GoalAverages,
    has_odds: bool,
) -> String {
    let base = format!(
        "Form: H({home_form}) A({away_form}) | Avg Goals: H({:.2}) A({:.2})",
        home_goals.scored, away_goals.scored
    );
    if has_odds {
        base
    } else {
        format!("NO_ODDS | {base}")
    }
}
