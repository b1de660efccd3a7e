//! CLI command implementations

use anyhow::Context;
use katana_client::*;
use katana_core::{ApiResult, ConfigStore, Settings};
use katana_tracker::{AutoTracker, EditorEvent, StatusPoller, StatusSummary, TrackerSettings};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Build a client from loaded settings.
pub fn connect(settings: &Settings) -> anyhow::Result<CostKatanaClient> {
    let config = settings.client_config()?;
    if !config.has_api_key() {
        tracing::debug!("No API key configured; requests are unauthenticated");
    }
    Ok(CostKatanaClient::new(ConfigStore::new(config))?)
}

/// Print the data of a successful result as JSON on stdout.
///
/// A failure becomes an error whose text is the backend's error and
/// message, nothing else.
fn emit<T: Serialize>(result: ApiResult<T>) -> anyhow::Result<()> {
    match result {
        ApiResult::Success { data } => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
        ApiResult::Failure { error, message } => Err(failure(error, message)),
    }
}

fn failure(error: String, message: Option<String>) -> anyhow::Error {
    match message {
        Some(message) => anyhow::anyhow!("{} ({})", error, message),
        None => anyhow::anyhow!("{}", error),
    }
}

// ── Settings ────────────────────────────────────────────────

/// Values given to `configure`; `None` leaves the stored value alone.
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
    pub auto_track: Option<bool>,
    pub show_notifications: Option<bool>,
    pub poll_interval: Option<u64>,
    pub model: Option<String>,
}

impl SettingsUpdate {
    /// Empty key or user id clears the stored value.
    pub fn apply(self, settings: &mut Settings) {
        if let Some(url) = self.backend_url {
            settings.backend_url = url;
        }
        if let Some(key) = self.api_key {
            settings.api_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        if let Some(user) = self.user_id {
            settings.user_id = Some(user).filter(|u| !u.trim().is_empty());
        }
        if let Some(auto_track) = self.auto_track {
            settings.auto_track = auto_track;
        }
        if let Some(show) = self.show_notifications {
            settings.show_notifications = show;
        }
        if let Some(secs) = self.poll_interval {
            settings.poll_interval_secs = secs;
        }
        if let Some(model) = self.model {
            settings.default_model = model;
        }
    }
}

/// Reads the file alone; environment overrides are never written back.
pub fn configure(path: &Path, update: SettingsUpdate) -> anyhow::Result<()> {
    let mut settings = Settings::load(path)?;
    update.apply(&mut settings);

    // Refuse to store a backend URL the client would reject
    settings.client_config()?;
    settings.save(path)?;

    tracing::info!("Settings written to {}", path.display());
    Ok(())
}

// ── Account ─────────────────────────────────────────────────

pub async fn login(client: &CostKatanaClient, email: String, open_browser: bool) -> anyhow::Result<()> {
    let data = match client.generate_magic_link(&MagicLinkRequest::new(email)).await {
        ApiResult::Success { data } => data,
        ApiResult::Failure { error, message } => return Err(failure(error, message)),
    };

    let Some(link) = data.link() else {
        println!("{}", data.message.as_deref().unwrap_or("Check your email for a login link"));
        return Ok(());
    };

    println!("{}", link);
    if open_browser {
        if let Err(e) = open::that(link) {
            tracing::warn!("Could not open browser: {}", e);
        }
    }
    Ok(())
}

pub async fn validate(client: &CostKatanaClient) -> anyhow::Result<()> {
    emit(client.validate_connection().await)
}

pub async fn status(client: &CostKatanaClient) -> anyhow::Result<()> {
    emit(client.get_user_status().await)
}

// ── Usage ───────────────────────────────────────────────────

pub async fn track(client: &CostKatanaClient, request: TrackUsageRequest) -> anyhow::Result<()> {
    emit(client.track_usage(&request).await)
}

pub async fn analytics(client: &CostKatanaClient, time_range: Option<String>) -> anyhow::Result<()> {
    emit(client.get_analytics(&AnalyticsRequest { time_range }).await)
}

pub async fn monitor(client: &CostKatanaClient) -> anyhow::Result<()> {
    emit(client.trigger_monitoring().await)
}

pub async fn pricing(client: &CostKatanaClient) -> anyhow::Result<()> {
    emit(client.get_pricing_updates().await)
}

// ── Prompt tooling ──────────────────────────────────────────

pub async fn optimize(
    client: &CostKatanaClient,
    prompt: String,
    model: Option<String>,
    context: Option<String>,
) -> anyhow::Result<()> {
    let request = OptimizePromptRequest {
        prompt,
        model,
        context,
    };
    emit(client.optimize_prompt(&request).await)
}

pub async fn score(
    client: &CostKatanaClient,
    prompt: String,
    response: String,
    model: Option<String>,
) -> anyhow::Result<()> {
    let request = QualityScoreRequest {
        prompt,
        response,
        model,
    };
    emit(client.score_response_quality(&request).await)
}

pub async fn templates(client: &CostKatanaClient, category: Option<String>) -> anyhow::Result<()> {
    emit(client.get_prompt_templates(&TemplatesRequest { category }).await)
}

pub async fn tips(client: &CostKatanaClient, context: Option<String>) -> anyhow::Result<()> {
    emit(client.get_personalized_tips(&TipsRequest { context }).await)
}

// ── Cost intelligence ───────────────────────────────────────

pub async fn compare_pricing(
    client: &CostKatanaClient,
    models: Vec<String>,
    task_type: Option<String>,
    estimated_tokens: Option<u64>,
) -> anyhow::Result<()> {
    let request = ComparePricingRequest {
        models,
        task_type,
        estimated_tokens,
    };
    emit(client.compare_pricing(&request).await)
}

pub async fn compare_models(
    client: &CostKatanaClient,
    prompt: String,
    models: Vec<String>,
) -> anyhow::Result<()> {
    emit(
        client
            .run_model_comparison(&ModelComparisonRequest { prompt, models })
            .await,
    )
}

pub async fn forecast(client: &CostKatanaClient, timeframe: Option<String>) -> anyhow::Result<()> {
    emit(client.generate_cost_forecast(&ForecastRequest { timeframe }).await)
}

pub async fn opportunities(client: &CostKatanaClient, timeframe: Option<String>) -> anyhow::Result<()> {
    emit(client.analyze_opportunities(&OpportunitiesRequest { timeframe }).await)
}

pub async fn ask(client: &CostKatanaClient, query: String, context: Option<String>) -> anyhow::Result<()> {
    emit(client.query_agent(&AgentQueryRequest { query, context }).await)
}

// ── Workspace / projects ────────────────────────────────────

pub async fn projects(client: &CostKatanaClient) -> anyhow::Result<()> {
    emit(client.get_projects().await)
}

pub async fn create_project(
    client: &CostKatanaClient,
    name: String,
    description: Option<String>,
    budget: Option<f64>,
) -> anyhow::Result<()> {
    let request = CreateProjectRequest {
        name,
        description,
        budget,
    };
    emit(client.create_project(&request).await)
}

pub async fn analyze_code(
    client: &CostKatanaClient,
    file: PathBuf,
    language: Option<String>,
) -> anyhow::Result<()> {
    let code = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let request = AnalyzeCodeRequest {
        code,
        language: language.unwrap_or_else(|| language_for(&file).to_string()),
        file_path: Some(file.display().to_string()),
    };
    emit(client.analyze_code(&request).await)
}

pub async fn suggestions(
    client: &CostKatanaClient,
    current_file: Option<String>,
    language: Option<String>,
    code_snippet: Option<String>,
) -> anyhow::Result<()> {
    let language = language.or_else(|| {
        current_file
            .as_deref()
            .map(|f| language_for(Path::new(f)).to_string())
    });
    let request = SuggestionsRequest {
        context: EditorContext {
            current_file,
            language,
            code_snippet,
        },
    };
    emit(client.get_suggestions(&request).await)
}

pub async fn workspace_setup(
    client: &CostKatanaClient,
    path: PathBuf,
    language: Option<String>,
    framework: Option<String>,
) -> anyhow::Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let request = WorkspaceSetupRequest {
        workspace: WorkspaceInfo {
            name,
            path: path.display().to_string(),
            language,
            framework,
        },
    };
    emit(client.workspace_setup(&request).await)
}

/// Editor language id for a file, from its extension.
pub fn language_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "cs" => "csharp",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "swift" => "swift",
        "php" => "php",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "sh" | "bash" => "shellscript",
        _ => "plaintext",
    }
}

// ── Background tracking ─────────────────────────────────────

/// Track editor events read from stdin until it closes, with the status
/// poller running alongside.
pub async fn watch(client: CostKatanaClient, settings: &Settings, poll: bool) -> anyhow::Result<()> {
    tracing::info!("Reading editor events from stdin");

    let poller = poll.then(|| {
        let poller = StatusPoller::new(client.clone(), settings.poll_interval());
        let mut summaries = poller.subscribe();
        let show = settings.show_notifications;
        tokio::spawn(async move {
            while summaries.changed().await.is_ok() {
                let line = summaries
                    .borrow_and_update()
                    .as_ref()
                    .and_then(|summary| status_line(summary, show));
                if let Some(line) = line {
                    println!("{}", line);
                }
            }
        });
        poller.spawn()
    });

    let tracker = AutoTracker::new(client, TrackerSettings::from(settings));
    let (tx, rx) = mpsc::unbounded_channel();
    let tracking = tokio::spawn(tracker.run(rx));

    // Bytes, not `lines()`: one undecodable line must not end the session
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match stdin.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Stopped reading editor events: {}", e);
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EditorEvent>(&line) {
            Ok(event) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!("Ignoring malformed editor event: {}", e),
        }
    }

    drop(tx);
    tracking.await?;
    if let Some(handle) = poller {
        handle.abort();
    }

    tracing::info!("Editor event stream finished");
    Ok(())
}

/// JSON line printed for a poller update, if notifications are on.
fn status_line(summary: &StatusSummary, show_notifications: bool) -> Option<String> {
    if !show_notifications {
        return None;
    }
    serde_json::to_string(summary).ok()
}
