//! Request payloads for the action catalog
//!
//! Each struct serializes to the action-specific fields of the envelope.
//! Optional fields are left out of the JSON when unset.

use katana_core::TokenUsage;
use serde::{Deserialize, Serialize};

/// Prompt reduction the optimizer is asked for, in percent.
pub const TARGET_REDUCTION_PERCENT: u32 = 20;

/// Default `request_type` for tracked usage.
pub const DEFAULT_REQUEST_TYPE: &str = "code_generation";

/// Origin reported with magic-link requests.
pub const MAGIC_LINK_SOURCE: &str = "cursor";

/// Placeholder for actions that carry only identity fields.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoFields {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl MagicLinkRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            source: Some(MAGIC_LINK_SOURCE.to_string()),
        }
    }
}

// ── Usage tracking ──────────────────────────────────────────

/// One AI interaction to record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackUsageRequest {
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub request_type: Option<String>,
    pub language: Option<String>,
    pub context_files: Vec<String>,
    /// Wall-clock time of the interaction, in milliseconds.
    pub execution_time: Option<u64>,
}

impl TrackUsageRequest {
    pub fn new(
        prompt: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_request_type(mut self, request_type: impl Into<String>) -> Self {
        self.request_type = Some(request_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_context_file(mut self, file: impl Into<String>) -> Self {
        self.context_files.push(file.into());
        self
    }

    pub fn with_execution_time(mut self, millis: u64) -> Self {
        self.execution_time = Some(millis);
        self
    }

    /// Wire fields, with token counts estimated client-side.
    pub(crate) fn payload(&self) -> TrackUsagePayload<'_> {
        TrackUsagePayload {
            prompt: &self.prompt,
            response: &self.response,
            model: &self.model,
            tokens_used: TokenUsage::estimate(&self.prompt, &self.response),
            request_type: self.request_type.as_deref().unwrap_or(DEFAULT_REQUEST_TYPE),
            language: self.language.as_deref(),
            context_files: &self.context_files,
            execution_time: self.execution_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TrackUsagePayload<'a> {
    pub prompt: &'a str,
    pub response: &'a str,
    pub model: &'a str,
    pub tokens_used: TokenUsage,
    pub request_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub context_files: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}

// ── Prompt tooling ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptimizePromptRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub context: Option<String>,
}

impl OptimizePromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Reduction target and quality flag are fixed.
    pub(crate) fn payload(&self) -> OptimizePromptPayload<'_> {
        OptimizePromptPayload {
            prompt: &self.prompt,
            model: self.model.as_deref(),
            context: self.context.as_deref(),
            target_reduction: TARGET_REDUCTION_PERCENT,
            preserve_quality: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OptimizePromptPayload<'a> {
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
    pub target_reduction: u32,
    pub preserve_quality: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityScoreRequest {
    pub prompt: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TipsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

// ── Analytics ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsRequest {
    /// e.g. `today`, `7d`, `30d`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
}

impl AnalyticsRequest {
    pub fn for_range(time_range: impl Into<String>) -> Self {
        Self {
            time_range: Some(time_range.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpportunitiesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

// ── Workspace / projects ────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkspaceSetupRequest {
    pub workspace: WorkspaceInfo,
}

/// Where the developer is working right now.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuggestionsRequest {
    pub context: EditorContext,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyzeCodeRequest {
    pub code: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Monthly budget in USD.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

// ── Cost intelligence ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelComparisonRequest {
    pub prompt: String,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparePricingRequest {
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentQueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}
