use crate::models::alert_api::AlertProvider;
use crate::models::geo_utils::Municipality;
use crate::models::normalize::{AlertRow, Normalized, normalize};
use crate::models::query::{Disease, QueryWindow};
use crate::models::{alert_api, geo_utils};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Sweep configuration for customizing a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Target state abbreviation (2 letters)
    pub uf: String,
    /// Disease and week/year window sent with every alert query
    pub window: QueryWindow,
    /// Fixed delay inserted between consecutive alert calls
    pub delay: Duration,
    /// Per-request timeout for both collaborators
    pub request_timeout: Duration,
    /// Path of the consolidated CSV artifact
    pub output_path: PathBuf,
    /// Base URL of the IBGE localities API
    pub ibge_base_url: String,
    /// Base URL of the InfoDengue alert API
    pub alert_base_url: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            uf: "PR".to_string(),
            window: QueryWindow::default(),
            delay: Duration::from_millis(300),
            request_timeout: Duration::from_secs(30),
            output_path: PathBuf::from("infodengue.csv"),
            ibge_base_url: geo_utils::IBGE_LOCALITIES_URL.to_string(),
            alert_base_url: alert_api::INFODENGUE_ALERT_URL.to_string(),
        }
    }
}

impl SweepConfig {
    pub fn with_uf(mut self, uf: impl Into<String>) -> Self {
        self.uf = uf.into();
        self
    }

    pub fn with_window(mut self, window: QueryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_disease(mut self, disease: Disease) -> Self {
        self.window = self.window.with_disease(disease);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }
}

/// Capability that blocks until the next remote call is permitted.
/// The sweep driver acquires it once per municipality, so alternative
/// policies (token bucket, adaptive backoff) slot in without touching
/// the classification logic.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}

/// Constant inter-call spacing. The first acquire returns immediately;
/// every later one sleeps the full delay, which spaces N calls by at
/// least (N-1) * delay.
#[derive(Debug)]
pub struct FixedDelayLimiter {
    delay: Duration,
    first: AtomicBool,
}

impl FixedDelayLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            first: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl RateLimiter for FixedDelayLimiter {
    async fn acquire(&self) {
        if self.first.swap(false, Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(self.delay).await;
    }
}

/// Classification of one municipality's fetch+normalize attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { rows: usize },
    Empty,
    Failure { reason: String },
}

/// Per-municipality result record, kept for the run summary only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MunicipalityOutcome {
    pub municipality: String,
    pub geocode: u32,
    pub outcome: Outcome,
}

/// Everything a sweep produced: the accumulated rows of all successful
/// municipalities (in iteration order) and one outcome per municipality.
#[derive(Debug, Default)]
pub struct SweepOutput {
    pub rows: Vec<AlertRow>,
    pub outcomes: Vec<MunicipalityOutcome>,
}

/// Sequential fetch-normalize-classify driver.
///
/// Iterates the municipalities in directory order, one remote call at a
/// time, with the limiter acquired before each call. Entity-level errors
/// are captured as outcomes and never escape the loop.
pub struct SweepDriver<P, L> {
    provider: P,
    limiter: L,
}

impl<P: AlertProvider, L: RateLimiter> SweepDriver<P, L> {
    pub fn new(provider: P, limiter: L) -> Self {
        Self { provider, limiter }
    }

    pub async fn run(&self, municipalities: &[Municipality], window: &QueryWindow) -> SweepOutput {
        let total = municipalities.len();
        let progress = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.yellow} [{elapsed_precise}] [{wide_bar:.magenta}] {pos}/{len} {msg}",
        ) {
            progress.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }

        let mut output = SweepOutput::default();
        for (idx, municipality) in municipalities.iter().enumerate() {
            self.limiter.acquire().await;
            progress.set_message(municipality.name.clone());

            let outcome = self.process(municipality, window, &mut output.rows).await;
            match &outcome {
                Outcome::Success { rows } => {
                    log::info!(
                        "[{}/{}] ✓ {}: {} registros",
                        idx + 1,
                        total,
                        municipality.name,
                        rows
                    );
                }
                Outcome::Empty => {
                    log::info!("[{}/{}] ○ {}: sem dados", idx + 1, total, municipality.name);
                }
                Outcome::Failure { reason } => {
                    log::warn!("[{}/{}] ✗ {}: {}", idx + 1, total, municipality.name, reason);
                }
            }

            output.outcomes.push(MunicipalityOutcome {
                municipality: municipality.name.clone(),
                geocode: municipality.geocode,
                outcome,
            });
            progress.inc(1);
        }
        progress.finish_and_clear();

        output
    }

    async fn process(
        &self,
        municipality: &Municipality,
        window: &QueryWindow,
        rows: &mut Vec<AlertRow>,
    ) -> Outcome {
        let raw = match self
            .provider
            .fetch_alerts(municipality.geocode, window)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                return Outcome::Failure {
                    reason: e.to_string(),
                };
            }
        };

        match normalize(&raw, &municipality.name, municipality.geocode) {
            Ok(Normalized::Rows(batch)) => {
                let count = batch.len();
                rows.extend(batch);
                Outcome::Success { rows: count }
            }
            Ok(Normalized::Empty) => Outcome::Empty,
            Err(e) => Outcome::Failure {
                reason: e.to_string(),
            },
        }
    }
}
