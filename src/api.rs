use std::cell::Cell;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::warn;

use crate::config::Config;

/// Fixed-attempt, fixed-delay retry schedule shared by every outbound call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }
}

/// Handle for the sports-data provider. Owns the blocking HTTP client, the
/// retry policy and the inter-request spacing state; constructed by the
/// caller and passed by reference into the pipeline.
pub struct ApiClient {
    client: Client,
    base_url: String,
    host: String,
    api_key: String,
    retry: RetryPolicy,
    min_interval: Duration,
    last_request: Cell<Option<Instant>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build http client")?;
        let host = config
            .api_base
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            client,
            base_url: config.api_base.clone(),
            host,
            api_key: config.api_key.clone(),
            retry: RetryPolicy::new(config.retry_attempts, config.retry_delay),
            min_interval: config.min_request_interval,
            last_request: Cell::new(None),
        })
    }

    /// GET a provider endpoint. Every attempt is paced to the minimum
    /// inter-request interval; transport failures, non-2xx statuses and
    /// populated `errors` payloads (even on HTTP 200) all take the same
    /// retry path. Returns `None` once attempts are exhausted — absence of
    /// data is a normal branch for callers, never an error.
    pub fn get(&self, path: &str, query: &[(&str, String)]) -> Option<Value> {
        for attempt in 1..=self.retry.max_attempts {
            self.pace();
            match self.try_get(path, query) {
                Ok(value) => return Some(value),
                Err(err) => {
                    warn!(
                        path,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "provider request failed"
                    );
                    if attempt < self.retry.max_attempts {
                        thread::sleep(self.retry.retry_delay);
                    }
                }
            }
        }
        None
    }

    fn try_get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let resp = self
            .client
            .get(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(query)
            .send()
            .context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow!("http {}: {}", status, snippet(&body)));
        }
        let value: Value = serde_json::from_str(&body).context("invalid provider json")?;
        if let Some(errors) = provider_errors(&value) {
            return Err(anyhow!("provider error payload: {errors}"));
        }
        Ok(value)
    }

    fn pace(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }
}

/// The provider reports application-level failures in an `errors` field that
/// may be a list, a map or a string, and is present but empty on success.
pub fn provider_errors(value: &Value) -> Option<String> {
    match value.get("errors") {
        Some(Value::Array(items)) if !items.is_empty() => Some(Value::Array(items.clone()).to_string()),
        Some(Value::Object(map)) if !map.is_empty() => Some(Value::Object(map.clone()).to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(220)
        .collect()
}
