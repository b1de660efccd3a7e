//! Core data structures shared by the client and the host

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::{self, Deserializer, IntoDeserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Client configuration ────────────────────────────────────

/// Connection settings read on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    api_key: Option<String>,
    user_id: Option<String>,
}

impl ClientConfig {
    /// Create a config for the given backend URL with no identity set.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: validate_base_url(&base_url.into())?,
            api_key: None,
            user_id: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = non_empty(Some(api_key.into()));
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = non_empty(Some(user_id.into()));
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Join the base URL with a path fragment.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Normalize a backend URL: trimmed, absolute http(s), no trailing slash.
pub fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("URL is empty".to_string()));
    }

    let parsed = reqwest::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("URL has no host".to_string()));
    }

    Ok(trimmed.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Shared, explicitly owned handle to the current [`ClientConfig`].
///
/// Clones point at the same config. Readers take a snapshot; an update is
/// seen by the next request, never by one already in flight.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    inner: Arc<RwLock<ClientConfig>>,
}

impl ConfigStore {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Copy of the config as of now.
    pub fn snapshot(&self) -> ClientConfig {
        self.read().clone()
    }

    pub fn has_api_key(&self) -> bool {
        self.read().has_api_key()
    }

    /// Point subsequent requests at a new backend. Invalid URLs leave the
    /// current value untouched.
    pub fn set_base_url(&self, base_url: &str) -> Result<(), ConfigError> {
        let base_url = validate_base_url(base_url)?;
        tracing::debug!("Backend URL set to {}", base_url);
        self.write().base_url = base_url;
        Ok(())
    }

    /// Set or clear the API key. Blank keys clear it.
    pub fn set_api_key(&self, api_key: Option<String>) {
        let api_key = non_empty(api_key);
        tracing::debug!("API key {}", if api_key.is_some() { "updated" } else { "cleared" });
        self.write().api_key = api_key;
    }

    pub fn set_user_id(&self, user_id: Option<String>) {
        self.write().user_id = non_empty(user_id);
    }

    pub fn replace(&self, config: ClientConfig) {
        *self.write() = config;
    }

    fn read(&self) -> RwLockReadGuard<'_, ClientConfig> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientConfig> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Result envelope ─────────────────────────────────────────

/// Outcome of every backend call.
///
/// On the wire this is `{ success, data?, error?, message? }`. Exactly one
/// of `data` / `error` is meaningful, and the enum makes the other
/// combinations unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success { data: T },
    Failure { error: String, message: Option<String> },
}

/// Default message for a failure body that carries no `error`.
pub const DEFAULT_FAILURE: &str = "Request failed";

impl<T> ApiResult<T> {
    pub fn success(data: T) -> Self {
        ApiResult::Success { data }
    }

    pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
        ApiResult::Failure {
            error: error.into(),
            message: Some(message.into()),
        }
    }

    /// A failure with no human-facing message.
    pub fn bare_failure(error: impl Into<String>) -> Self {
        ApiResult::Failure {
            error: error.into(),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResult::Success { data } => Some(data),
            ApiResult::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            ApiResult::Success { data } => Some(data),
            ApiResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ApiResult::Success { .. } => None,
            ApiResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ApiResult::Success { .. } => None,
            ApiResult::Failure { message, .. } => message.as_deref(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Success { data } => ApiResult::Success { data: f(data) },
            ApiResult::Failure { error, message } => ApiResult::Failure { error, message },
        }
    }
}

impl<T: Serialize> Serialize for ApiResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ApiResult::Success { data } => {
                let mut state = serializer.serialize_struct("ApiResult", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
                state.end()
            }
            ApiResult::Failure { error, message } => {
                let len = if message.is_some() { 3 } else { 2 };
                let mut state = serializer.serialize_struct("ApiResult", len)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", error)?;
                if let Some(message) = message {
                    state.serialize_field("message", message)?;
                }
                state.end()
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct WireResult<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ApiResult<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireResult::<T>::deserialize(deserializer)?;

        if !wire.success {
            return Ok(ApiResult::Failure {
                error: wire.error.unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
                message: wire.message,
            });
        }

        match wire.data {
            Some(data) => Ok(ApiResult::Success { data }),
            // `data: null` or no `data` at all: accept only for types that
            // can stand for "nothing" (Value, Option, unit).
            None => {
                let unit: de::value::UnitDeserializer<D::Error> = ().into_deserializer();
                T::deserialize(unit)
                    .map(|data| ApiResult::Success { data })
                    .map_err(|_| {
                        <D::Error as de::Error>::custom("successful response is missing `data`")
                    })
            }
        }
    }
}
