//! Automatic tracking of likely AI-generated edits

use katana_client::{CostKatanaClient, TrackUsageRequest};
use katana_core::{ApiResult, DEFAULT_MODEL, Settings};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Insertions must be longer than this (in UTF-16 units) to look AI-made.
pub const MIN_AI_EDIT_LEN: usize = 50;

/// UTF-16 units of label and text kept in a fingerprint.
pub const FINGERPRINT_PREFIX: usize = 100;

/// A run of text the editor inserted into a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInsertion {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub text: String,
}

impl TextInsertion {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            language: None,
            text: text.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Stands in for the prompt when the edit is tracked.
    pub fn label(&self) -> String {
        format!("AI-assisted edit in {}", self.file_name)
    }

    /// Long and multi-line. A heuristic: pastes match too, and short
    /// completions are missed.
    pub fn is_ai_like(&self) -> bool {
        self.text.encode_utf16().count() > MIN_AI_EDIT_LEN && self.text.contains('\n')
    }
}

/// Events the host editor forwards to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditorEvent {
    /// Text was inserted into a document
    Insertion(TextInsertion),
    /// The user toggled automatic tracking
    SetEnabled { enabled: bool },
}

/// Cheap equality key for deduplication; not a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Prefix of the label followed by prefix of the text.
    pub fn new(label: &str, text: &str) -> Self {
        let mut key = utf16_prefix(label, FINGERPRINT_PREFIX).to_string();
        key.push_str(utf16_prefix(text, FINGERPRINT_PREFIX));
        Fingerprint(key)
    }

    pub fn of(insertion: &TextInsertion) -> Self {
        Self::new(&insertion.label(), &insertion.text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Longest prefix of `s` that fits in `units` UTF-16 code units. A
/// surrogate pair straddling the limit is left out.
fn utf16_prefix(s: &str, units: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        used += c.len_utf16();
        if used > units {
            return &s[..idx];
        }
    }
    s
}

/// What the tracker decided for one insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDecision {
    /// Tracking is off or no API key is configured
    Disabled,
    /// The edit does not look AI-generated
    NotAiLike,
    /// Same fingerprint as the last accepted edit
    Duplicate,
    /// Will be (or was) sent to the backend
    Accepted,
}

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub enabled: bool,
    /// Model label reported for tracked edits
    pub model: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl From<&Settings> for TrackerSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            enabled: settings.auto_track,
            model: settings.default_model.clone(),
        }
    }
}

/// Turns editor insertions into `track_usage` calls.
///
/// Only the last accepted fingerprint is remembered, so only immediate
/// repeats are suppressed. Clones share the toggle and the slot.
#[derive(Debug, Clone)]
pub struct AutoTracker {
    client: CostKatanaClient,
    model: String,
    enabled: Arc<AtomicBool>,
    last_accepted: Arc<Mutex<Option<Fingerprint>>>,
}

impl AutoTracker {
    pub fn new(client: CostKatanaClient, settings: TrackerSettings) -> Self {
        Self {
            client,
            model: settings.model,
            enabled: Arc::new(AtomicBool::new(settings.enabled)),
            last_accepted: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        info!("Automatic tracking {}", if enabled { "enabled" } else { "disabled" });
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Decide what to do with an insertion, recording it as the last
    /// accepted fingerprint when accepted.
    ///
    /// The gate runs before anything is fingerprinted.
    pub fn evaluate(&self, insertion: &TextInsertion) -> TrackDecision {
        if !self.is_enabled() || !self.client.config().has_api_key() {
            return TrackDecision::Disabled;
        }
        if !insertion.is_ai_like() {
            return TrackDecision::NotAiLike;
        }

        let fingerprint = Fingerprint::of(insertion);
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.as_ref() == Some(&fingerprint) {
            debug!("Skipping duplicate edit in {}", insertion.file_name);
            return TrackDecision::Duplicate;
        }
        *last = Some(fingerprint);
        TrackDecision::Accepted
    }

    /// Evaluate an insertion and, if accepted, track it before returning.
    pub async fn observe(&self, insertion: &TextInsertion) -> TrackDecision {
        let decision = self.evaluate(insertion);
        if decision == TrackDecision::Accepted {
            self.track(insertion).await;
        }
        decision
    }

    /// Consume editor events until the sender side is dropped, then wait
    /// for tracking calls still in flight.
    ///
    /// Accepted edits are tracked on their own tasks so a slow backend
    /// never holds up the next event.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<EditorEvent>) {
        info!("Automatic tracking listening for editor events");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(EditorEvent::Insertion(insertion)) => {
                        if self.evaluate(&insertion) == TrackDecision::Accepted {
                            let tracker = self.clone();
                            in_flight.spawn(async move {
                                tracker.track(&insertion).await;
                            });
                        }
                    }
                    Some(EditorEvent::SetEnabled { enabled }) => self.set_enabled(enabled),
                    None => break,
                },
                // Reap finished calls as they complete
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        while in_flight.join_next().await.is_some() {}
        info!("Editor event stream closed");
    }

    // Failures are logged and dropped: nobody asked for this call.
    async fn track(&self, insertion: &TextInsertion) {
        let mut request =
            TrackUsageRequest::new(insertion.label(), insertion.text.as_str(), self.model.as_str())
                .with_context_file(insertion.file_name.as_str());
        if let Some(language) = &insertion.language {
            request = request.with_language(language.as_str());
        }

        match self.client.track_usage(&request).await {
            ApiResult::Success { data } => {
                debug!(
                    "Tracked edit in {} (cost: {:?})",
                    insertion.file_name, data.cost
                );
            }
            ApiResult::Failure { error, .. } => {
                warn!("Automatic tracking failed for {}: {}", insertion.file_name, error);
            }
        }
    }
}
