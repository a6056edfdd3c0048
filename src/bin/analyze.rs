use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use matchday::analysis::{self, AnalystClient, AnalystConfig};
use matchday::store::Database;

const DEFAULT_BATCH_LIMIT: u32 = 50;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = db_path_from_env();
    let limit = std::env::var("ANALYST_BATCH_LIMIT")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_BATCH_LIMIT);

    let db = Database::open(&db_path)?;
    let analyst = AnalystClient::new(AnalystConfig::from_env()?)?;
    let summary = analysis::analyze_pending(&analyst, &db, limit)?;

    println!("Analysis pass complete");
    println!("DB: {}", db_path.display());
    println!("Examined: {}", summary.examined);
    println!("Analyzed: {}", summary.analyzed);
    if !summary.failures.is_empty() {
        println!("Failures: {}", summary.failures.len());
        for err in summary.failures.iter().take(6) {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn db_path_from_env() -> PathBuf {
    std::env::var("MATCHDAY_DB")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("matchday.sqlite"))
}
