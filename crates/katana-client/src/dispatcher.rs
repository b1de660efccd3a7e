//! Request dispatcher: builds one HTTP call and normalizes its outcome

use katana_core::model::DEFAULT_FAILURE;
use katana_core::{Action, ApiResult, ClientConfig, ConfigStore};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Multiplexed endpoint every catalog action is posted to.
pub const ACTION_PATH: &str = "/cursor/action";

/// Message attached to transport-class failures.
pub const NETWORK_ERROR: &str = "Network error occurred";

/// HTTP verbs the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// JSON body of every multiplexed request.
///
/// Identity keys are always written, `null` when unset, so every action
/// carries the same two fields.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, P: Serialize + ?Sized> {
    pub action: Action,
    pub user_id: Option<&'a str>,
    pub api_key: Option<&'a str>,
    #[serde(flatten)]
    pub fields: &'a P,
}

impl<'a, P: Serialize + ?Sized> Envelope<'a, P> {
    pub fn new(action: Action, config: &'a ClientConfig, fields: &'a P) -> Self {
        Self {
            action,
            user_id: config.user_id(),
            api_key: config.api_key(),
            fields,
        }
    }
}

/// Error text of a non-2xx response. Each field is read on its own, so a
/// non-string `error` still leaves a usable `message`.
#[derive(Debug, Default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn parse(bytes: &[u8]) -> Self {
        let Ok(body) = serde_json::from_slice::<Value>(bytes) else {
            return Self::default();
        };
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            error: text("error"),
            message: text("message"),
        }
    }
}

/// Sends requests to the configured backend and turns every outcome into
/// an [`ApiResult`]. Expected failures never panic and never return `Err`.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    config: ConfigStore,
}

impl Dispatcher {
    pub fn new(config: ConfigStore) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cost-katana/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Send `payload` to `path`. The body is only attached to POSTs.
    pub async fn request<T, P>(&self, method: Method, path: &str, payload: Option<&P>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let config = self.config.snapshot();
        self.send(&config, method, path, payload).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.request::<T, ()>(Method::Get, path, None).await
    }

    pub async fn post<T, P>(&self, path: &str, payload: &P) -> ApiResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.request(Method::Post, path, Some(payload)).await
    }

    /// Post `fields` to the multiplexed endpoint under `action`.
    ///
    /// Envelope identity and the request itself come from one snapshot.
    pub async fn dispatch<T, P>(&self, action: Action, fields: &P) -> ApiResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let config = self.config.snapshot();
        let envelope = Envelope::new(action, &config, fields);
        debug!("Dispatching action: {}", action);
        self.send(&config, Method::Post, ACTION_PATH, Some(&envelope)).await
    }

    async fn send<T, P>(
        &self,
        config: &ClientConfig,
        method: Method,
        path: &str,
        payload: Option<&P>,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let url = config.url(path);
        debug!("{:?} {}", method, url);

        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        }
        .header(CONTENT_TYPE, "application/json");

        if let Some(key) = config.api_key() {
            builder = builder.bearer_auth(key);
        }
        if let (Method::Post, Some(payload)) = (method, payload) {
            builder = builder.json(payload);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return transport_failure(config, &e),
        };

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = match response.bytes().await {
                Ok(bytes) => ErrorBody::parse(&bytes),
                Err(_) => ErrorBody::default(),
            };
            let error = body.error.unwrap_or_else(|| {
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                )
            });
            warn!("Request to {} failed with {}: {}", url, status, error);
            return ApiResult::Failure {
                error,
                message: Some(body.message.unwrap_or_else(|| DEFAULT_FAILURE.to_string())),
            };
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return transport_failure(config, &e),
        };

        match serde_json::from_slice::<ApiResult<T>>(&bytes) {
            Ok(result) => {
                if let Some(error) = result.error() {
                    debug!("Backend reported failure for {}: {}", url, error);
                }
                result
            }
            Err(e) => {
                warn!("Malformed response from {}: {}", url, e);
                ApiResult::failure(
                    format!(
                        "Invalid response from Cost Katana backend at {}: {}",
                        config.base_url(),
                        e
                    ),
                    NETWORK_ERROR,
                )
            }
        }
    }
}

fn transport_failure<T>(config: &ClientConfig, err: &reqwest::Error) -> ApiResult<T> {
    warn!("Backend unreachable at {}: {}", config.base_url(), err);
    ApiResult::failure(
        format!(
            "Unable to reach Cost Katana backend at {}: {}",
            config.base_url(),
            err
        ),
        NETWORK_ERROR,
    )
}
