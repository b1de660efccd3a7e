//! HTTP client for the Cost Katana backend
//!
//! This crate provides the request dispatcher that normalizes every
//! backend response into an `ApiResult`, and the action catalog with one
//! typed operation per backend capability.

pub mod dispatcher;
pub mod catalog;
pub mod payloads;
pub mod responses;
pub mod error;

#[cfg(test)]
pub mod tests;

pub use catalog::CostKatanaClient;
pub use dispatcher::{Dispatcher, Method};
pub use error::ClientError;
pub use payloads::*;
pub use responses::*;
