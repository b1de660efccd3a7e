//! Action tags understood by the multiplexed `/cursor/action` endpoint

use std::fmt;

use serde::{Deserialize, Serialize};

/// Selects server-side behavior on the dispatch endpoint.
///
/// The set is closed: the backend rejects unknown tags, so new capabilities
/// are added here first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    // ── Account ─────────────────────────────────────────────
    GenerateMagicLink,
    GetUserStatus,

    // ── Usage tracking ──────────────────────────────────────
    TrackUsage,
    GetAnalytics,
    TriggerMonitoring,

    // ── Prompt tooling ──────────────────────────────────────
    OptimizePrompt,
    ScoreResponseQuality,
    GetPromptTemplates,
    GetPersonalizedTips,

    // ── Workspace / projects ────────────────────────────────
    WorkspaceSetup,
    GetSuggestions,
    AnalyzeCode,
    GetProjects,
    CreateProject,

    // ── Cost intelligence ───────────────────────────────────
    RunModelComparison,
    ComparePricing,
    GenerateCostForecast,
    QueryAgent,
    AnalyzeOpportunities,
}

impl Action {
    pub const ALL: [Action; 19] = [
        Action::GenerateMagicLink,
        Action::GetUserStatus,
        Action::TrackUsage,
        Action::GetAnalytics,
        Action::TriggerMonitoring,
        Action::OptimizePrompt,
        Action::ScoreResponseQuality,
        Action::GetPromptTemplates,
        Action::GetPersonalizedTips,
        Action::WorkspaceSetup,
        Action::GetSuggestions,
        Action::AnalyzeCode,
        Action::GetProjects,
        Action::CreateProject,
        Action::RunModelComparison,
        Action::ComparePricing,
        Action::GenerateCostForecast,
        Action::QueryAgent,
        Action::AnalyzeOpportunities,
    ];

    /// Wire tag, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::GenerateMagicLink => "generate_magic_link",
            Action::GetUserStatus => "get_user_status",
            Action::TrackUsage => "track_usage",
            Action::GetAnalytics => "get_analytics",
            Action::TriggerMonitoring => "trigger_monitoring",
            Action::OptimizePrompt => "optimize_prompt",
            Action::ScoreResponseQuality => "score_response_quality",
            Action::GetPromptTemplates => "get_prompt_templates",
            Action::GetPersonalizedTips => "get_personalized_tips",
            Action::WorkspaceSetup => "workspace_setup",
            Action::GetSuggestions => "get_suggestions",
            Action::AnalyzeCode => "analyze_code",
            Action::GetProjects => "get_projects",
            Action::CreateProject => "create_project",
            Action::RunModelComparison => "run_model_comparison",
            Action::ComparePricing => "compare_pricing",
            Action::GenerateCostForecast => "generate_cost_forecast",
            Action::QueryAgent => "query_agent",
            Action::AnalyzeOpportunities => "analyze_opportunities",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
