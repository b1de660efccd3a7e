//! Client-side token estimation for usage tracking

use serde::{Deserialize, Serialize};

/// Characters per token assumed by the backend's estimator.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens as `ceil(len / 4)`.
///
/// Length is counted in UTF-16 code units, which is what the backend's
/// other clients measure. This is a heuristic the backend relies on, not a
/// tokenizer, and must stay that way.
pub fn estimate_tokens(text: &str) -> u64 {
    text.encode_utf16().count().div_ceil(CHARS_PER_TOKEN) as u64
}

/// Token counts sent with `track_usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Estimate prompt and response independently; the total is their sum.
    pub fn estimate(prompt: &str, response: &str) -> Self {
        let prompt_tokens = estimate_tokens(prompt);
        let completion_tokens = estimate_tokens(response);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}
