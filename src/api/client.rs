use crate::api::{MonitoringApi, UpstreamError};
use digest_auth::AuthContext;
use reqwest::{
    Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

/// HTTP client for the public API, authenticating with HTTP digest.
///
/// Each call is sent without credentials first; a `401` carrying a digest
/// challenge is answered once for the exact request URI. No timeout and no
/// retry are configured.
pub struct OpsManagerClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    apikey: SecretString,
}

impl OpsManagerClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        apikey: SecretString,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            apikey,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, UpstreamError> {
        let raw = format!("{}{path}", self.base_url);

        let mut url = Url::parse(&raw).map_err(|source| UpstreamError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;

        // query_pairs_mut() on an empty list would still append a bare '?'
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    async fn send(&self, url: &Url, authorization: Option<&str>) -> Result<Response, UpstreamError> {
        let mut request = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json");

        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        request.send().await.map_err(|source| UpstreamError::Transport {
            url: url.to_string(),
            source,
        })
    }

    fn answer_challenge(&self, url: &Url, response: &Response) -> Result<String, UpstreamError> {
        let challenge_error = |reason: String| UpstreamError::Challenge {
            url: url.to_string(),
            reason,
        };

        let header = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| challenge_error("missing WWW-Authenticate header".to_string()))?;

        let mut prompt =
            digest_auth::parse(header).map_err(|e| challenge_error(e.to_string()))?;

        let uri = request_uri(url);
        let context = AuthContext::new(
            self.username.as_str(),
            self.apikey.expose_secret(),
            uri.as_str(),
        );

        let answer = prompt
            .respond(&context)
            .map_err(|e| challenge_error(e.to_string()))?;

        Ok(answer.to_header_string())
    }
}

impl MonitoringApi for OpsManagerClient {
    #[instrument(skip(self, query), level = "debug", err, fields(otel.kind = "client"))]
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        let url = self.resolve(path, query)?;

        let mut response = self.send(&url, None).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("answering digest challenge");
            let authorization = self.answer_challenge(&url, &response)?;
            response = self.send(&url, Some(&authorization)).await?;
        }

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| UpstreamError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

/// The request-target the digest response is computed over: path plus query.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}
