mod common;

use std::net::TcpListener;
use std::time::Duration;

use matchday::analysis::{
    AnalystClient, AnalystConfig, Prediction, RiskLevel, analyze_pending, parse_verdict,
};
use matchday::form::GoalAverages;
use matchday::odds::OddsQuote;
use matchday::store::{Database, MatchRecord};

const VALID: &str = r#"{"prediction": "AWAY_WIN", "confidence": 64.5, "reasoning": "Visitors unbeaten in five.", "recommended_bet": "Away Win @2.95", "risk_level": "LOW", "expected_value": 1.08}"#;

#[test]
fn accepts_schema_conforming_reply() {
    let verdict = parse_verdict(VALID).expect("valid reply should parse");
    assert_eq!(verdict.prediction, Prediction::AwayWin);
    assert_eq!(verdict.risk_level, RiskLevel::Low);
    assert_eq!(verdict.confidence, 64.5);
    assert_eq!(verdict.expected_value, 1.08);
}

#[test]
fn accepts_fenced_json() {
    let fenced = format!("```json\n{VALID}\n```");
    assert!(parse_verdict(&fenced).is_ok());
    let fenced_plain = format!("```\n{VALID}\n```");
    assert!(parse_verdict(&fenced_plain).is_ok());
}

#[test]
fn rejects_prose_reply() {
    assert!(parse_verdict("I think the away side wins this one.").is_err());
}

#[test]
fn rejects_unknown_prediction_variant() {
    let raw = VALID.replace("AWAY_WIN", "AWAY");
    assert!(parse_verdict(&raw).is_err());
}

#[test]
fn rejects_out_of_range_confidence() {
    let raw = VALID.replace("64.5", "140.0");
    assert!(parse_verdict(&raw).is_err());
    let raw = VALID.replace("64.5", "-3.0");
    assert!(parse_verdict(&raw).is_err());
}

#[test]
fn rejects_extra_fields() {
    let raw = VALID.replacen('{', r#"{"note": "hello", "#, 1);
    assert!(parse_verdict(&raw).is_err());
}

#[test]
fn rejects_missing_field() {
    let raw = VALID.replace(r#""risk_level": "LOW", "#, "");
    assert!(parse_verdict(&raw).is_err());
}

#[test]
fn rejects_empty_reasoning() {
    let raw = VALID.replace("Visitors unbeaten in five.", "  ");
    assert!(parse_verdict(&raw).is_err());
}

// A well-formed completion whose verdict content passes the schema.
const COMPLETION: &str = r#"{"choices":[{"message":{"content":"{\"prediction\": \"HOME_WIN\", \"confidence\": 70.0, \"reasoning\": \"Strong home form.\", \"recommended_bet\": \"Home Win\", \"risk_level\": \"LOW\", \"expected_value\": 1.10}"}}]}"#;

fn stub_analyst(base_url: String) -> AnalystClient {
    AnalystClient::new(AnalystConfig {
        api_key: "test-key".to_string(),
        base_url,
        model: "deepseek-chat".to_string(),
        temperature: 0.3,
        max_tokens: 500,
        timeout: Duration::from_secs(5),
    })
    .expect("build analyst client")
}

fn record_with_odds(match_id: &str) -> MatchRecord {
    let goals = GoalAverages {
        scored: 1.4,
        conceded: 1.1,
    };
    MatchRecord {
        match_id: match_id.to_string(),
        home_team: "Arsenal".to_string(),
        away_team: "Chelsea".to_string(),
        league: "Premier League".to_string(),
        match_date: "2026-08-22T16:30:00+00:00".to_string(),
        context_note: "Form: H(WWDWL) A(DLWWD) | Avg Goals: H(1.40) A(1.40)".to_string(),
        odds: Some(OddsQuote {
            source: "Bet365".to_string(),
            home: 2.10,
            draw: 3.40,
            away: 3.30,
            over_2_5: None,
            under_2_5: None,
            btts_yes: None,
            btts_no: None,
        }),
        home_form: "WWDWL".to_string(),
        away_form: "DLWWD".to_string(),
        home_goals: goals,
        away_goals: goals,
    }
}

// A row whose verdict cannot be written back is a per-row failure like any
// other; the remaining rows still get their turn and the batch returns Ok.
#[test]
fn verdict_write_failure_is_recorded_not_fatal() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("stub addr").to_string();
    let server = common::serve_json(listener, COMPLETION);

    let path = std::env::temp_dir().join(format!(
        "matchday-analysis-write-{}.sqlite",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let mut db = Database::open(&path).expect("open db");
    db.insert_record(&record_with_odds("9101")).expect("insert first row");
    db.insert_record(&record_with_odds("9102")).expect("insert second row");

    // Wedge the verdict write path from a second connection.
    let side = rusqlite::Connection::open(&path).expect("side connection");
    side.execute_batch(
        "CREATE TRIGGER wedge_verdicts BEFORE UPDATE OF ai_prediction ON predictions \
         BEGIN SELECT RAISE(ABORT, 'verdict writes disabled'); END;",
    )
    .expect("create trigger");

    let summary = analyze_pending(&stub_analyst(format!("http://{addr}")), &db, 10)
        .expect("batch must complete despite write failures");
    assert_eq!(summary.examined, 2);
    assert_eq!(summary.analyzed, 0);
    assert_eq!(summary.failures.len(), 2);
    assert!(summary.failures[0].starts_with("9101"));
    assert!(summary.failures[1].starts_with("9102"));

    common::stop_server(&addr);
    assert_eq!(server.join().expect("stub thread"), 2);

    drop(side);
    drop(db);
    let _ = std::fs::remove_file(&path);
}
