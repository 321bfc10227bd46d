use crate::models::query::QueryWindow;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default endpoint of the InfoDengue alert API
pub const INFODENGUE_ALERT_URL: &str = "https://info.dengue.mat.br/api/alertcity";

/// Per-municipality fetch failure. Never terminates the run: the sweep
/// loop records it as a `Failure` outcome and moves on.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Trait for alert-data providers, so the sweep driver can run against a
/// scripted source in tests.
#[async_trait]
pub trait AlertProvider: Send + Sync {
    /// Fetch the raw weekly records for one municipality. A successful
    /// call may still carry zero records; that is the caller's Empty
    /// outcome, not an error.
    async fn fetch_alerts(&self, geocode: u32, window: &QueryWindow) -> Result<Value, FetchError>;

    /// Get the name of the alert provider
    fn provider_name(&self) -> &'static str;
}

/// HTTP provider for the InfoDengue `alertcity` endpoint.
///
/// One bounded-timeout attempt per municipality, no retry.
#[derive(Debug, Clone)]
pub struct InfoDengueProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl InfoDengueProvider {
    /// Create a provider with InfoDengue defaults
    pub fn new_infodengue() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: INFODENGUE_ALERT_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AlertProvider for InfoDengueProvider {
    async fn fetch_alerts(&self, geocode: u32, window: &QueryWindow) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("geocode", geocode.to_string()),
                ("disease", window.disease.as_str().to_string()),
                ("format", "json".to_string()),
                ("ew_start", window.ew_start.to_string()),
                ("ew_end", window.ew_end.to_string()),
                ("ey_start", window.ey_start.to_string()),
                ("ey_end", window.ey_end.to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        // The API answers some municipality/window combinations with an
        // entirely empty body; that is a valid "no data" response.
        if body.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn provider_name(&self) -> &'static str {
        "infodengue"
    }
}
