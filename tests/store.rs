use matchday::analysis::{MatchVerdict, Prediction, RiskLevel};
use matchday::collector::context_note;
use matchday::form::GoalAverages;
use matchday::odds::OddsQuote;
use matchday::store::{Database, MatchRecord};

fn sample_quote() -> OddsQuote {
    OddsQuote {
        source: "Bet365".to_string(),
        home: 2.30,
        draw: 3.40,
        away: 2.95,
        over_2_5: Some(1.85),
        under_2_5: Some(1.95),
        btts_yes: Some(1.72),
        btts_no: None,
    }
}

fn sample_record(match_id: &str, odds: Option<OddsQuote>) -> MatchRecord {
    let home_goals = GoalAverages {
        scored: 1.6,
        conceded: 0.9,
    };
    let away_goals = GoalAverages {
        scored: 1.2,
        conceded: 1.4,
    };
    MatchRecord {
        match_id: match_id.to_string(),
        home_team: "Manchester United".to_string(),
        away_team: "Liverpool".to_string(),
        league: "Premier League".to_string(),
        match_date: "2026-08-22T14:00:00+00:00".to_string(),
        context_note: context_note("WWDLW", "LDWWD", home_goals, away_goals, odds.is_some()),
        odds,
        home_form: "WWDLW".to_string(),
        away_form: "LDWWD".to_string(),
        home_goals,
        away_goals,
    }
}

fn sample_verdict() -> MatchVerdict {
    let raw = r#"{
        "prediction": "HOME_WIN",
        "confidence": 72.0,
        "reasoning": "Strong home form against a side conceding freely.",
        "recommended_bet": "Home Win @2.30",
        "risk_level": "MEDIUM",
        "expected_value": 1.15
    }"#;
    matchday::analysis::parse_verdict(raw).expect("sample verdict is valid")
}

#[test]
fn stores_record_with_full_quote() {
    let mut db = Database::open_in_memory().expect("open db");
    assert!(db.insert_record(&sample_record("9001", Some(sample_quote()))).expect("insert"));

    let row = db
        .fetch_record("9001")
        .expect("fetch")
        .expect("row should exist");
    assert!(row.has_odds);
    assert_eq!(row.odds_source.as_deref(), Some("Bet365"));
    assert_eq!(row.home_odds, Some(2.30));
    assert_eq!(row.draw_odds, Some(3.40));
    assert_eq!(row.away_odds, Some(2.95));
    assert_eq!(row.over_2_5_odds, Some(1.85));
    assert_eq!(row.btts_no_odds, None);
    assert!(row.context_note.starts_with("Form: H(WWDLW)"));
}

#[test]
fn record_without_odds_has_uniformly_null_columns() {
    let mut db = Database::open_in_memory().expect("open db");
    assert!(db.insert_record(&sample_record("9002", None)).expect("insert"));

    let row = db
        .fetch_record("9002")
        .expect("fetch")
        .expect("row should exist");
    assert!(!row.has_odds);
    assert!(row.odds_source.is_none());
    assert!(row.home_odds.is_none());
    assert!(row.draw_odds.is_none());
    assert!(row.away_odds.is_none());
    assert!(row.over_2_5_odds.is_none());
    assert!(row.under_2_5_odds.is_none());
    assert!(row.btts_yes_odds.is_none());
    assert!(row.btts_no_odds.is_none());
    assert!(row.context_note.starts_with("NO_ODDS | "));
}

#[test]
fn reinsert_is_a_noop_and_preserves_fields() {
    let mut db = Database::open_in_memory().expect("open db");
    assert!(db.insert_record(&sample_record("9003", Some(sample_quote()))).expect("insert"));

    // A later run observing different prices must not clobber the row.
    let mut second = sample_record("9003", None);
    second.home_team = "Someone Else".to_string();
    assert!(!db.insert_record(&second).expect("reinsert"));

    let row = db
        .fetch_record("9003")
        .expect("fetch")
        .expect("row should exist");
    assert_eq!(row.home_team, "Manchester United");
    assert!(row.has_odds);
    assert_eq!(row.home_odds, Some(2.30));
}

#[test]
fn missing_record_fetches_as_none() {
    let db = Database::open_in_memory().expect("open db");
    assert!(db.fetch_record("nope").expect("fetch").is_none());
}

#[test]
fn analysis_and_dispatch_queues() {
    let mut db = Database::open_in_memory().expect("open db");
    db.insert_record(&sample_record("9004", Some(sample_quote())))
        .expect("insert with odds");
    db.insert_record(&sample_record("9005", None))
        .expect("insert without odds");

    // Only the row with odds qualifies for analysis.
    let pending = db.pending_analysis(50).expect("pending analysis");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].match_id, "9004");

    let verdict = sample_verdict();
    assert!(db.store_verdict("9004", &verdict).expect("store verdict"));
    assert!(db.pending_analysis(50).expect("pending analysis").is_empty());

    let dispatch = db.pending_dispatch(50).expect("pending dispatch");
    assert_eq!(dispatch.len(), 1);
    assert_eq!(dispatch[0].match_id, "9004");
    assert_eq!(dispatch[0].ai_prediction.as_deref(), Some("HOME_WIN"));

    assert!(db.mark_dispatched("9004").expect("mark dispatched"));
    assert!(db.pending_dispatch(50).expect("pending dispatch").is_empty());
}

#[test]
fn verdict_for_unknown_row_updates_nothing() {
    let db = Database::open_in_memory().expect("open db");
    assert!(!db.store_verdict("nope", &sample_verdict()).expect("store verdict"));
    assert!(!db.mark_dispatched("nope").expect("mark dispatched"));
}

#[test]
fn context_note_renders_two_decimal_averages() {
    let home = GoalAverages {
        scored: 1.0,
        conceded: 0.5,
    };
    let away = GoalAverages {
        scored: 1.33,
        conceded: 2.0,
    };
    // Whole-number averages keep their decimal shape in the annotation.
    assert_eq!(
        context_note("WWWWW", "LLLLL", home, away, true),
        "Form: H(WWWWW) A(LLLLL) | Avg Goals: H(1.00) A(1.33)"
    );
    assert_eq!(
        context_note("N/A", "N/A", home, away, false),
        "NO_ODDS | Form: H(N/A) A(N/A) | Avg Goals: H(1.00) A(1.33)"
    );
}

#[test]
fn verdict_fields_survive_prediction_roundtrip() {
    let verdict = sample_verdict();
    assert_eq!(verdict.prediction, Prediction::HomeWin);
    assert_eq!(verdict.risk_level, RiskLevel::Medium);
    assert_eq!(verdict.prediction.as_str(), "HOME_WIN");
}
