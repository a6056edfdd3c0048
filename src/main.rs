use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, Utc};
use tracing_subscriber::EnvFilter;

use matchday::api::ApiClient;
use matchday::collector::{self, CollectOptions};
use matchday::config::{self, Config};
use matchday::store::Database;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::from_env()?;
    if let Some(ids) = parse_league_ids_arg() {
        config.league_ids = ids;
    }
    if let Some(path) = parse_db_arg() {
        config.db_path = path;
    }
    let date = match parse_date_arg() {
        Some(raw) => {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| anyhow!("invalid --date {raw}, expected YYYY-MM-DD"))?;
            raw
        }
        None => Utc::now().format("%Y-%m-%d").to_string(),
    };

    let api = ApiClient::new(&config)?;
    let mut db = Database::open(&config.db_path)?;
    let opts = CollectOptions::from_config(&config, date);
    let summary = collector::collect_day(&api, &mut db, &opts)?;

    println!("Collection complete for {}", opts.date);
    println!("DB: {}", config.db_path.display());
    println!("Leagues: {:?}", opts.league_ids);
    println!("Fixtures seen: {}", summary.fixtures_seen);
    println!(
        "Stored: {} (with odds {}, without odds {})",
        summary.stored, summary.with_odds, summary.without_odds
    );
    println!("Already present: {}", summary.already_present);
    if !summary.failures.is_empty() {
        println!("Failures: {}", summary.failures.len());
        for err in summary.failures.iter().take(6) {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn parse_date_arg() -> Option<String> {
    flag_value("--date")
}

fn parse_db_arg() -> Option<PathBuf> {
    flag_value("--db").map(PathBuf::from)
}

fn parse_league_ids_arg() -> Option<Vec<u32>> {
    let raw = flag_value("--league-ids")?;
    let ids = config::parse_ids(&raw);
    if ids.is_empty() { None } else { Some(ids) }
}

fn flag_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(flag)
            && let Some(value) = value.strip_prefix('=')
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
        {
            let trimmed = next.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}
