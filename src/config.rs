use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

const DEFAULT_API_BASE: &str = "https://v3.football.api-sports.io";
const DEFAULT_DB_FILE: &str = "matchday.sqlite";

/// Leagues collected when MATCHDAY_LEAGUE_IDS is unset: Premier League,
/// La Liga, Serie A, Bundesliga, Ligue 1, Süper Lig.
pub const DEFAULT_LEAGUE_IDS: &[u32] = &[39, 140, 135, 78, 61, 203];

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MIN_INTERVAL_MS: u64 = 1000;
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_BOOKMAKER_PAUSE_MS: u64 = 500;
const DEFAULT_FIXTURE_PAUSE_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub api_key: String,
    pub db_path: PathBuf,
    pub league_ids: Vec<u32>,
    pub request_timeout: Duration,
    pub min_request_interval: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub bookmaker_pause: Duration,
    pub fixture_pause: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("API_KEY is not set"))?;

        let api_base = env::var("MATCHDAY_API_BASE")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let db_path = env::var("MATCHDAY_DB")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));

        let league_ids = match env::var("MATCHDAY_LEAGUE_IDS") {
            Ok(raw) => {
                let ids = parse_ids(&raw);
                if ids.is_empty() {
                    return Err(anyhow!("MATCHDAY_LEAGUE_IDS is set but has no valid ids"));
                }
                ids
            }
            Err(_) => DEFAULT_LEAGUE_IDS.to_vec(),
        };

        Ok(Self {
            api_base,
            api_key,
            db_path,
            league_ids,
            request_timeout: Duration::from_secs(env_u64(
                "MATCHDAY_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            min_request_interval: Duration::from_millis(env_u64(
                "MATCHDAY_MIN_INTERVAL_MS",
                DEFAULT_MIN_INTERVAL_MS,
            )),
            retry_attempts: env_u64("MATCHDAY_RETRY_ATTEMPTS", DEFAULT_RETRY_ATTEMPTS as u64)
                .max(1) as u32,
            retry_delay: Duration::from_millis(env_u64(
                "MATCHDAY_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )),
            bookmaker_pause: Duration::from_millis(env_u64(
                "MATCHDAY_BOOKMAKER_PAUSE_MS",
                DEFAULT_BOOKMAKER_PAUSE_MS,
            )),
            fixture_pause: Duration::from_millis(env_u64(
                "MATCHDAY_FIXTURE_PAUSE_MS",
                DEFAULT_FIXTURE_PAUSE_MS,
            )),
        })
    }
}

pub fn parse_ids(raw: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for part in raw.split([',', ';', ' ']) {
        let Ok(id) = part.trim().parse::<u32>() else {
            continue;
        };
        if id != 0 && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
