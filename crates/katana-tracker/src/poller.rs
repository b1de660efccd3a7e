//! Periodic status refresh for the status bar

use chrono::{DateTime, Utc};
use katana_client::{AnalyticsData, AnalyticsRequest, CostKatanaClient};
use katana_core::{ApiResult, DEFAULT_POLL_INTERVAL_SECS};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS);

/// Shorter intervals are raised to this; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Analytics window shown in the status bar.
pub const STATUS_TIME_RANGE: &str = "today";

/// Latest numbers for the status bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_requests: u64,
    pub updated_at: DateTime<Utc>,
}

impl StatusSummary {
    /// Missing figures count as zero.
    pub fn from_analytics(data: &AnalyticsData, updated_at: DateTime<Utc>) -> Self {
        Self {
            total_cost: data.total_cost.unwrap_or_default(),
            total_tokens: data.total_tokens.unwrap_or_default(),
            total_requests: data.total_requests.unwrap_or_default(),
            updated_at,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "Cost Katana: ${:.4} today ({} tokens, {} requests)",
            self.total_cost, self.total_tokens, self.total_requests
        )
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No API key yet; nothing was sent
    Skipped,
    Updated(StatusSummary),
    /// The backend call failed; the previous summary stays published
    Failed(String),
}

/// Refreshes the usage summary on a fixed interval.
///
/// Subscribers see the latest summary, or `None` until the first
/// successful poll.
#[derive(Debug)]
pub struct StatusPoller {
    client: CostKatanaClient,
    interval: Duration,
    summary: watch::Sender<Option<StatusSummary>>,
}

impl StatusPoller {
    pub fn new(client: CostKatanaClient, interval: Duration) -> Self {
        let (summary, _) = watch::channel(None);
        Self {
            client,
            interval: interval.max(MIN_POLL_INTERVAL),
            summary,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusSummary>> {
        self.summary.subscribe()
    }

    /// Poll once and publish the result if it succeeded.
    pub async fn tick(&self) -> TickOutcome {
        if !self.client.config().has_api_key() {
            debug!("Status poll skipped: no API key configured");
            return TickOutcome::Skipped;
        }

        let request = AnalyticsRequest::for_range(STATUS_TIME_RANGE);
        match self.client.get_analytics(&request).await {
            ApiResult::Success { data } => {
                let summary = StatusSummary::from_analytics(&data, Utc::now());
                debug!("Status updated: {}", summary.label());
                self.summary.send_replace(Some(summary.clone()));
                TickOutcome::Updated(summary)
            }
            ApiResult::Failure { error, .. } => {
                warn!("Status poll failed: {}", error);
                TickOutcome::Failed(error)
            }
        }
    }

    /// Run the poll loop on a background task until it is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Poll forever. The first poll happens immediately; a slow poll
    /// pushes the following ones back instead of bunching them up.
    pub async fn run(self) {
        info!("Status polling every {}s", self.interval.as_secs_f64());

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }
}
