use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::store::{Database, StoredRecord};

const DEFAULT_ANALYST_BASE: &str = "https://api.deepseek.com/v1";
const DEFAULT_ANALYST_MODEL: &str = "deepseek-chat";
const DEFAULT_ANALYST_TIMEOUT_SECS: u64 = 30;

/// A malformed reply costs one of these; each retry is a fresh completion
/// request, not a reparse of the old text.
const SCHEMA_RETRY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct AnalystConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl AnalystConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("DEEPSEEK_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("DEEPSEEK_API_KEY is not set"))?;
        let base_url = env::var("ANALYST_API_BASE")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ANALYST_BASE.to_string());
        let model = env::var("ANALYST_MODEL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ANALYST_MODEL.to_string());
        Ok(Self {
            api_key,
            base_url,
            model,
            temperature: 0.3,
            max_tokens: 500,
            timeout: Duration::from_secs(DEFAULT_ANALYST_TIMEOUT_SECS),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Prediction {
    #[serde(rename = "HOME_WIN")]
    HomeWin,
    #[serde(rename = "DRAW")]
    Draw,
    #[serde(rename = "AWAY_WIN")]
    AwayWin,
    #[serde(rename = "OVER_2_5")]
    Over25,
    #[serde(rename = "UNDER_2_5")]
    Under25,
    #[serde(rename = "BTTS_YES")]
    BttsYes,
    #[serde(rename = "BTTS_NO")]
    BttsNo,
}

impl Prediction {
    pub fn as_str(self) -> &'static str {
        match self {
            Prediction::HomeWin => "HOME_WIN",
            Prediction::Draw => "DRAW",
            Prediction::AwayWin => "AWAY_WIN",
            Prediction::Over25 => "OVER_2_5",
            Prediction::Under25 => "UNDER_2_5",
            Prediction::BttsYes => "BTTS_YES",
            Prediction::BttsNo => "BTTS_NO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// The exact shape the model must answer with. Unknown fields, missing
/// fields and wrong types are all schema violations; no substring scraping
/// of free-form prose happens anywhere.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchVerdict {
    pub prediction: Prediction,
    pub confidence: f64,
    pub reasoning: String,
    pub recommended_bet: String,
    pub risk_level: RiskLevel,
    pub expected_value: f64,
}

/// Validates a raw model reply against the verdict schema. Tolerates a
/// Markdown code fence around the JSON, nothing else.
pub fn parse_verdict(raw: &str) -> Result<MatchVerdict> {
    let cleaned = strip_code_fences(raw);
    let verdict: MatchVerdict =
        serde_json::from_str(cleaned).context("reply does not match the verdict schema")?;
    if !(0.0..=100.0).contains(&verdict.confidence) {
        return Err(anyhow!(
            "confidence {} outside the 0..=100 range",
            verdict.confidence
        ));
    }
    if !verdict.expected_value.is_finite() {
        return Err(anyhow!("expected_value is not a finite number"));
    }
    if verdict.reasoning.trim().is_empty() {
        return Err(anyhow!("reasoning is empty"));
    }
    Ok(verdict)
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

pub struct AnalystClient {
    client: Client,
    config: AnalystConfig,
}

impl AnalystClient {
    pub fn new(config: AnalystConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build analyst http client")?;
        Ok(Self { client, config })
    }

    pub fn request_verdict(&self, record: &StoredRecord) -> Result<MatchVerdict> {
        let prompt = build_prompt(record);
        let mut last_err = anyhow!("no verdict attempts made");
        for attempt in 1..=SCHEMA_RETRY_ATTEMPTS {
            match self
                .complete(&prompt)
                .and_then(|content| parse_verdict(&content))
            {
                Ok(verdict) => return Ok(verdict),
                Err(err) => {
                    warn!(
                        match_id = %record.match_id,
                        attempt,
                        max_attempts = SCHEMA_RETRY_ATTEMPTS,
                        error = %err,
                        "verdict attempt rejected"
                    );
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .context("analyst request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("analyst http {}: {}", status, text.trim()));
        }
        let completion: ChatCompletion =
            resp.json().context("invalid chat completion json")?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion had no choices"))
    }
}

fn build_prompt(record: &StoredRecord) -> String {
    let mut lines = vec![
        "You are a football betting analyst. Analyze this match:".to_string(),
        String::new(),
        format!("{} vs {}", record.home_team, record.away_team),
        format!("League: {}", record.league),
        format!("Kickoff: {}", record.match_date),
        format!("Context: {}", record.context_note),
    ];
    if let (Some(home), Some(draw), Some(away)) =
        (record.home_odds, record.draw_odds, record.away_odds)
    {
        lines.push(format!(
            "1X2 odds ({}): home {:.2}, draw {:.2}, away {:.2}",
            record.odds_source.as_deref().unwrap_or("unknown"),
            home,
            draw,
            away
        ));
    }
    lines.push(String::new());
    lines.push(
        "Answer with ONLY a JSON object, no prose and no extra fields:".to_string(),
    );
    lines.push(
        r#"{"prediction": "HOME_WIN|DRAW|AWAY_WIN|OVER_2_5|UNDER_2_5|BTTS_YES|BTTS_NO", "confidence": 0-100, "reasoning": "...", "recommended_bet": "...", "risk_level": "LOW|MEDIUM|HIGH", "expected_value": 1.0}"#
            .to_string(),
    );
    lines.join("\n")
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    pub examined: usize,
    pub analyzed: usize,
    pub failures: Vec<String>,
}

/// Runs the verdict stage over rows that have odds but no analysis yet.
/// A single row's failure is recorded and never aborts the batch.
pub fn analyze_pending(
    analyst: &AnalystClient,
    db: &Database,
    limit: u32,
) -> Result<AnalysisSummary> {
    let rows = db.pending_analysis(limit)?;
    let mut summary = AnalysisSummary::default();
    for row in rows {
        summary.examined += 1;
        match analyst.request_verdict(&row) {
            Ok(verdict) => match db.store_verdict(&row.match_id, &verdict) {
                Ok(_) => {
                    summary.analyzed += 1;
                    info!(
                        match_id = %row.match_id,
                        prediction = verdict.prediction.as_str(),
                        confidence = verdict.confidence,
                        "verdict stored"
                    );
                }
                Err(err) => {
                    warn!(match_id = %row.match_id, error = %err, "verdict write failed");
                    summary
                        .failures
                        .push(format!("{}: {err:#}", row.match_id));
                }
            },
            Err(err) => {
                warn!(match_id = %row.match_id, error = %err, "analysis failed for row");
                summary
                    .failures
                    .push(format!("{}: {err:#}", row.match_id));
            }
        }
    }
    Ok(summary)
}
