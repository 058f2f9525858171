//! Read-only access to the OpsManager / Atlas public API.
//!
//! Every call is a GET returning JSON. Any status other than 200 is an
//! [`UpstreamError`] and the caller is expected to stop the run.

use serde_json::Value;
use std::future::Future;
use thiserror::Error;

mod client;
pub mod paths;

pub use client::OpsManagerClient;

pub trait MonitoringApi {
    /// GET `path` (relative to the API base URL) with the given query pairs.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, on any status other than 200,
    /// or when the body is not JSON
    fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<Value, UpstreamError>> + Send;
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("status code {status} while calling {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot answer authentication challenge from {url}: {reason}")]
    Challenge { url: String, reason: String },

    #[error("invalid request URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl UpstreamError {
    /// HTTP status of the failed call, when the server answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
