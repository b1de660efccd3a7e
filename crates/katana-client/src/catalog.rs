//! Action catalog: one typed operation per backend capability

use katana_core::{Action, ApiResult, ClientConfig, ConfigStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::ClientError;
use crate::payloads::*;
use crate::responses::*;

/// Health paths probed by [`CostKatanaClient::validate_connection`], in order.
pub const HEALTH_PATHS: [&str; 3] = ["/cursor/health", "/health", "/api/health"];

pub const PRICING_UPDATES_PATH: &str = "/pricing/updates";

/// Direct endpoint used only when the `generate_magic_link` action fails.
pub const MAGIC_LINK_PATH: &str = "/auth/magic-link";

/// Typed client for the Cost Katana backend.
///
/// Cheap to clone; clones share the HTTP pool and the configuration.
#[derive(Debug, Clone)]
pub struct CostKatanaClient {
    dispatcher: Dispatcher,
}

impl CostKatanaClient {
    pub fn new(config: ConfigStore) -> Result<Self, ClientError> {
        Ok(Self {
            dispatcher: Dispatcher::new(config)?,
        })
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        Self::new(ConfigStore::new(config))
    }

    pub fn config(&self) -> &ConfigStore {
        self.dispatcher.config()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ── Dedicated paths ─────────────────────────────────────

    /// Probe the health endpoints in order and return the first success.
    ///
    /// When none answers, the result is a single synthesized failure rather
    /// than whatever the last probe said.
    pub async fn validate_connection(&self) -> ApiResult<Value> {
        for path in HEALTH_PATHS {
            let result = self.dispatcher.get::<Value>(path).await;
            if result.is_success() {
                info!("Backend reachable via {}", path);
                return result;
            }
            debug!(
                "Health probe {} failed: {}",
                path,
                result.error().unwrap_or_default()
            );
        }

        let base_url = self.config().snapshot().base_url().to_string();
        warn!("No health endpoint answered at {}", base_url);
        ApiResult::failure(
            format!(
                "Unable to validate connection to {}: no health endpoint responded successfully (tried {})",
                base_url,
                HEALTH_PATHS.join(", ")
            ),
            "Connection validation failed",
        )
    }

    pub async fn get_pricing_updates(&self) -> ApiResult<Value> {
        self.dispatcher.get(PRICING_UPDATES_PATH).await
    }

    // ── Account ─────────────────────────────────────────────

    /// Request a login link, falling back to the direct endpoint once.
    ///
    /// The fallback's result is final, whatever the first attempt said.
    pub async fn generate_magic_link(&self, request: &MagicLinkRequest) -> ApiResult<MagicLinkData> {
        let first = self
            .dispatcher
            .dispatch(Action::GenerateMagicLink, request)
            .await;
        if first.is_success() {
            return first;
        }

        warn!(
            "Magic link action failed ({}), retrying via {}",
            first.error().unwrap_or_default(),
            MAGIC_LINK_PATH
        );
        self.dispatcher.post(MAGIC_LINK_PATH, request).await
    }

    pub async fn get_user_status(&self) -> ApiResult<UserStatusData> {
        self.dispatcher
            .dispatch(Action::GetUserStatus, &NoFields {})
            .await
    }

    // ── Usage tracking ──────────────────────────────────────

    /// Record one interaction. Token counts are estimated from text length.
    pub async fn track_usage(&self, request: &TrackUsageRequest) -> ApiResult<TrackUsageData> {
        let payload = request.payload();
        debug!(
            "Tracking usage for {}: {} tokens",
            request.model, payload.tokens_used.total_tokens
        );
        self.dispatcher.dispatch(Action::TrackUsage, &payload).await
    }

    pub async fn get_analytics(&self, request: &AnalyticsRequest) -> ApiResult<AnalyticsData> {
        self.dispatcher.dispatch(Action::GetAnalytics, request).await
    }

    pub async fn trigger_monitoring(&self) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::TriggerMonitoring, &NoFields {})
            .await
    }

    // ── Prompt tooling ──────────────────────────────────────

    pub async fn optimize_prompt(&self, request: &OptimizePromptRequest) -> ApiResult<OptimizationData> {
        self.dispatcher
            .dispatch(Action::OptimizePrompt, &request.payload())
            .await
    }

    pub async fn score_response_quality(&self, request: &QualityScoreRequest) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::ScoreResponseQuality, request)
            .await
    }

    pub async fn get_prompt_templates(&self, request: &TemplatesRequest) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::GetPromptTemplates, request)
            .await
    }

    pub async fn get_personalized_tips(&self, request: &TipsRequest) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::GetPersonalizedTips, request)
            .await
    }

    // ── Workspace / projects ────────────────────────────────

    pub async fn workspace_setup(&self, request: &WorkspaceSetupRequest) -> ApiResult<Value> {
        self.dispatcher.dispatch(Action::WorkspaceSetup, request).await
    }

    pub async fn get_suggestions(&self, request: &SuggestionsRequest) -> ApiResult<Value> {
        self.dispatcher.dispatch(Action::GetSuggestions, request).await
    }

    pub async fn analyze_code(&self, request: &AnalyzeCodeRequest) -> ApiResult<Value> {
        self.dispatcher.dispatch(Action::AnalyzeCode, request).await
    }

    pub async fn get_projects(&self) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::GetProjects, &NoFields {})
            .await
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> ApiResult<Value> {
        self.dispatcher.dispatch(Action::CreateProject, request).await
    }

    // ── Cost intelligence ───────────────────────────────────

    pub async fn run_model_comparison(&self, request: &ModelComparisonRequest) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::RunModelComparison, request)
            .await
    }

    pub async fn compare_pricing(&self, request: &ComparePricingRequest) -> ApiResult<Value> {
        self.dispatcher.dispatch(Action::ComparePricing, request).await
    }

    pub async fn generate_cost_forecast(&self, request: &ForecastRequest) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::GenerateCostForecast, request)
            .await
    }

    pub async fn query_agent(&self, request: &AgentQueryRequest) -> ApiResult<Value> {
        self.dispatcher.dispatch(Action::QueryAgent, request).await
    }

    pub async fn analyze_opportunities(&self, request: &OpportunitiesRequest) -> ApiResult<Value> {
        self.dispatcher
            .dispatch(Action::AnalyzeOpportunities, request)
            .await
    }
}
