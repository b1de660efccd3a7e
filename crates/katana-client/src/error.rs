//! Error types for constructing the client

use katana_core::ConfigError;
use thiserror::Error;

/// Errors raised while building a client. Request failures never show up
/// here; they come back as `ApiResult::Failure`.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
