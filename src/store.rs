use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, Row, params};
use tracing::debug;

use crate::analysis::MatchVerdict;
use crate::form::GoalAverages;
use crate::odds::OddsQuote;

/// A fully assembled collection result, ready to persist.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub match_date: String,
    pub context_note: String,
    pub odds: Option<OddsQuote>,
    pub home_form: String,
    pub away_form: String,
    pub home_goals: GoalAverages,
    pub away_goals: GoalAverages,
}

/// A persisted row as downstream stages see it.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub match_date: String,
    pub has_odds: bool,
    pub odds_source: Option<String>,
    pub home_odds: Option<f64>,
    pub draw_odds: Option<f64>,
    pub away_odds: Option<f64>,
    pub over_2_5_odds: Option<f64>,
    pub under_2_5_odds: Option<f64>,
    pub btts_yes_odds: Option<f64>,
    pub btts_no_odds: Option<f64>,
    pub context_note: String,
    pub ai_prediction: Option<String>,
    pub telegram_sent: bool,
}

/// Explicitly constructed, explicitly owned database handle. Callers open
/// it once per run and pass it by reference into the pipeline; dropping it
/// closes the connection.
pub struct Database {
    conn: Connection,
}

const RECORD_COLUMNS: &str = "match_id, home_team, away_team, league, match_date, \
     has_odds, odds_source, home_odds, draw_odds, away_odds, \
     over_2_5_odds, under_2_5_odds, btts_yes_odds, btts_no_odds, \
     context_note, ai_prediction, telegram_sent";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Idempotent insert keyed on the fixture id. Returns `false` when the
    /// row already existed; a conflict is success, and previously stored
    /// odds are never refreshed by a later run.
    pub fn insert_record(&mut self, record: &MatchRecord) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().context("begin insert transaction")?;

        let odds = record.odds.as_ref();
        let inserted = tx
            .execute(
                r#"
                INSERT INTO predictions (
                    match_id, home_team, away_team, league, match_date,
                    has_odds, odds_source,
                    home_odds, draw_odds, away_odds,
                    over_2_5_odds, under_2_5_odds,
                    btts_yes_odds, btts_no_odds,
                    context_note, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7,
                    ?8, ?9, ?10,
                    ?11, ?12,
                    ?13, ?14,
                    ?15, ?16
                )
                ON CONFLICT(match_id) DO NOTHING
                "#,
                params![
                    record.match_id,
                    record.home_team,
                    record.away_team,
                    record.league,
                    record.match_date,
                    odds.is_some() as i64,
                    odds.map(|q| q.source.clone()),
                    odds.map(|q| q.home),
                    odds.map(|q| q.draw),
                    odds.map(|q| q.away),
                    odds.and_then(|q| q.over_2_5),
                    odds.and_then(|q| q.under_2_5),
                    odds.and_then(|q| q.btts_yes),
                    odds.and_then(|q| q.btts_no),
                    record.context_note,
                    now,
                ],
            )
            .context("insert prediction row")?
            > 0;

        tx.execute(
            r#"
            INSERT INTO match_stats (
                match_id, home_form, away_form,
                home_goals_avg, away_goals_avg,
                home_conceded_avg, away_conceded_avg,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(match_id) DO NOTHING
            "#,
            params![
                record.match_id,
                record.home_form,
                record.away_form,
                record.home_goals.scored,
                record.away_goals.scored,
                record.home_goals.conceded,
                record.away_goals.conceded,
                now,
            ],
        )
        .context("insert match stats row")?;

        tx.commit().context("commit insert transaction")?;
        if !inserted {
            debug!(match_id = %record.match_id, "prediction row already present, skipped");
        }
        Ok(inserted)
    }

    pub fn fetch_record(&self, match_id: &str) -> Result<Option<StoredRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM predictions WHERE match_id = ?1");
        let mut stmt = self.conn.prepare(&sql).context("prepare fetch query")?;
        let mut rows = stmt
            .query_map(params![match_id], record_from_row)
            .context("query prediction row")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("decode prediction row")?)),
            None => Ok(None),
        }
    }

    /// Rows with odds that the analysis stage has not yet written back.
    pub fn pending_analysis(&self, limit: u32) -> Result<Vec<StoredRecord>> {
        self.select_records(
            "has_odds = 1 AND ai_prediction IS NULL",
            limit,
        )
    }

    /// Analyzed rows not yet delivered to the messaging endpoint.
    pub fn pending_dispatch(&self, limit: u32) -> Result<Vec<StoredRecord>> {
        self.select_records(
            "ai_prediction IS NOT NULL AND telegram_sent = 0",
            limit,
        )
    }

    pub fn store_verdict(&self, match_id: &str, verdict: &MatchVerdict) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE predictions SET
                    ai_prediction = ?1,
                    ai_confidence = ?2,
                    ai_reasoning = ?3,
                    recommended_bet = ?4,
                    risk_level = ?5,
                    expected_value = ?6,
                    analyzed_at = ?7
                WHERE match_id = ?8
                "#,
                params![
                    verdict.prediction.as_str(),
                    verdict.confidence,
                    verdict.reasoning,
                    verdict.recommended_bet,
                    verdict.risk_level.as_str(),
                    verdict.expected_value,
                    Utc::now().to_rfc3339(),
                    match_id,
                ],
            )
            .context("store verdict")?;
        Ok(changed > 0)
    }

    pub fn mark_dispatched(&self, match_id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE predictions SET telegram_sent = 1, telegram_sent_at = ?1 WHERE match_id = ?2",
                params![Utc::now().to_rfc3339(), match_id],
            )
            .context("mark dispatched")?;
        Ok(changed > 0)
    }

    fn select_records(&self, filter: &str, limit: u32) -> Result<Vec<StoredRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM predictions WHERE {filter} \
             ORDER BY match_date ASC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql).context("prepare select query")?;
        let rows = stmt
            .query_map(params![limit as i64], record_from_row)
            .context("query prediction rows")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode prediction row")?);
        }
        Ok(out)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        match_id: row.get(0)?,
        home_team: row.get(1)?,
        away_team: row.get(2)?,
        league: row.get(3)?,
        match_date: row.get(4)?,
        has_odds: row.get::<_, i64>(5)? != 0,
        odds_source: row.get(6)?,
        home_odds: row.get(7)?,
        draw_odds: row.get(8)?,
        away_odds: row.get(9)?,
        over_2_5_odds: row.get(10)?,
        under_2_5_odds: row.get(11)?,
        btts_yes_odds: row.get(12)?,
        btts_no_odds: row.get(13)?,
        context_note: row.get(14)?,
        ai_prediction: row.get(15)?,
        telegram_sent: row.get::<_, i64>(16)? != 0,
    })
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS predictions (
            match_id TEXT PRIMARY KEY,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            league TEXT NOT NULL,
            match_date TEXT NOT NULL,
            has_odds INTEGER NOT NULL DEFAULT 0,
            odds_source TEXT NULL,
            home_odds REAL NULL,
            draw_odds REAL NULL,
            away_odds REAL NULL,
            over_2_5_odds REAL NULL,
            under_2_5_odds REAL NULL,
            btts_yes_odds REAL NULL,
            btts_no_odds REAL NULL,
            context_note TEXT NOT NULL,
            ai_prediction TEXT NULL,
            ai_confidence REAL NULL,
            ai_reasoning TEXT NULL,
            recommended_bet TEXT NULL,
            risk_level TEXT NULL,
            expected_value REAL NULL,
            analyzed_at TEXT NULL,
            telegram_sent INTEGER NOT NULL DEFAULT 0,
            telegram_sent_at TEXT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_predictions_has_odds ON predictions(has_odds);
        CREATE INDEX IF NOT EXISTS idx_predictions_match_date ON predictions(match_date);
        CREATE INDEX IF NOT EXISTS idx_predictions_telegram_sent ON predictions(telegram_sent);

        CREATE TABLE IF NOT EXISTS match_stats (
            match_id TEXT PRIMARY KEY,
            home_form TEXT NOT NULL,
            away_form TEXT NOT NULL,
            home_goals_avg REAL NOT NULL,
            away_goals_avg REAL NOT NULL,
            home_conceded_avg REAL NOT NULL,
            away_conceded_avg REAL NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}
