use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::api::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmaker {
    pub id: u32,
    pub name: &'static str,
}

/// Fixed preference order; the first source with a complete 1X2 wins and
/// no merging happens across sources.
pub const BOOKMAKER_PRIORITY: [Bookmaker; 7] = [
    Bookmaker { id: 8, name: "Bet365" },
    Bookmaker { id: 11, name: "Betfair" },
    Bookmaker { id: 5, name: "William Hill" },
    Bookmaker { id: 6, name: "Bwin" },
    Bookmaker { id: 9, name: "188Bet" },
    Bookmaker { id: 12, name: "Unibet" },
    Bookmaker { id: 3, name: "Pinnacle" },
];

/// Market prices from a single bookmaker. The three 1X2 legs are mandatory
/// for acceptance; the over/under-2.5 and BTTS markets may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct OddsQuote {
    pub source: String,
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub over_2_5: Option<f64>,
    pub under_2_5: Option<f64>,
    pub btts_yes: Option<f64>,
    pub btts_no: Option<f64>,
}

pub fn resolve_fixture_odds(
    api: &ApiClient,
    fixture_id: u64,
    pause: Duration,
) -> Option<OddsQuote> {
    first_accepted(&BOOKMAKER_PRIORITY, pause, |bookmaker| {
        let query = [
            ("fixture", fixture_id.to_string()),
            ("bookmaker", bookmaker.id.to_string()),
        ];
        let payload = api.get("odds", &query)?;
        quote_from_payload(&payload, bookmaker.name)
    })
}

/// Walks the sources in priority order and stops at the first accepted
/// quote. The pause between attempts is politeness toward the provider's
/// rate limits, not a retry of the same source. Exhausting every source
/// yields `None`: an expected outcome, not a failure.
pub fn first_accepted(
    sources: &[Bookmaker],
    pause: Duration,
    mut attempt: impl FnMut(&Bookmaker) -> Option<OddsQuote>,
) -> Option<OddsQuote> {
    for (idx, bookmaker) in sources.iter().enumerate() {
        if idx > 0 && !pause.is_zero() {
            thread::sleep(pause);
        }
        match attempt(bookmaker) {
            Some(quote) => {
                info!(source = bookmaker.name, "odds accepted");
                return Some(quote);
            }
            None => debug!(source = bookmaker.name, "no usable odds from source"),
        }
    }
    None
}

/// Parses one bookmaker's `/odds` payload into a quote. A payload missing
/// any 1X2 leg is rejected outright so the search moves to the next source;
/// missing secondary markets do not block acceptance.
pub fn quote_from_payload(payload: &Value, source: &str) -> Option<OddsQuote> {
    let bookmaker = payload
        .get("response")?
        .as_array()?
        .first()?
        .get("bookmakers")?
        .as_array()?
        .first()?;
    let bets = bookmaker.get("bets")?.as_array()?;

    let mut home = None;
    let mut draw = None;
    let mut away = None;
    let mut over_2_5 = None;
    let mut under_2_5 = None;
    let mut btts_yes = None;
    let mut btts_no = None;

    for bet in bets {
        let name = bet.get("name").and_then(|v| v.as_str()).unwrap_or_default();
        let Some(values) = bet.get("values").and_then(|v| v.as_array()) else {
            continue;
        };
        match name {
            "Match Winner" => {
                for entry in values {
                    match bet_label(entry) {
                        "Home" => home = bet_price(entry),
                        "Draw" => draw = bet_price(entry),
                        "Away" => away = bet_price(entry),
                        _ => {}
                    }
                }
            }
            "Goals Over/Under" => {
                for entry in values {
                    let label = bet_label(entry);
                    if !label.contains("2.5") {
                        continue;
                    }
                    if label.starts_with("Over") {
                        over_2_5 = bet_price(entry);
                    } else if label.starts_with("Under") {
                        under_2_5 = bet_price(entry);
                    }
                }
            }
            "Both Teams Score" => {
                for entry in values {
                    match bet_label(entry) {
                        "Yes" => btts_yes = bet_price(entry),
                        "No" => btts_no = bet_price(entry),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    let (Some(home), Some(draw), Some(away)) = (home, draw, away) else {
        return None;
    };
    Some(OddsQuote {
        source: source.to_string(),
        home,
        draw,
        away,
        over_2_5,
        under_2_5,
        btts_yes,
        btts_no,
    })
}

fn bet_label(entry: &Value) -> &str {
    entry.get("value").and_then(|v| v.as_str()).unwrap_or_default()
}

// Prices arrive as strings ("1.85"); a few mirrors send bare numbers.
fn bet_price(entry: &Value) -> Option<f64> {
    match entry.get("odd") {
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}
