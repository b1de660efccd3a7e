//! Success-data shapes returned by the backend
//!
//! Every field is optional so a sparse reply still decodes; anything not
//! modelled lands in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MagicLinkData {
    pub magic_link: Option<String>,
    pub expires_in: Option<Value>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MagicLinkData {
    /// The login URL, under whichever key the backend used.
    pub fn link(&self) -> Option<&str> {
        self.magic_link
            .as_deref()
            .or_else(|| self.extra.get("url").and_then(Value::as_str))
            .or_else(|| self.extra.get("magicLink").and_then(Value::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackUsageData {
    pub usage_id: Option<String>,
    /// Cost of the interaction in USD.
    pub cost: Option<f64>,
    pub tokens: Option<u64>,
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationData {
    pub optimized_prompt: Option<String>,
    pub token_reduction: Option<f64>,
    pub cost_savings: Option<f64>,
    pub suggestions: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsData {
    pub total_cost: Option<f64>,
    pub total_tokens: Option<u64>,
    pub total_requests: Option<u64>,
    pub time_range: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStatusData {
    pub email: Option<String>,
    pub plan: Option<String>,
    pub usage: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
