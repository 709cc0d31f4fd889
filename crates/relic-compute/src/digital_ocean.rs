//! DigitalOcean v2 API client.
//!
//! Only droplet destruction is needed: `DELETE /v2/droplets/{id}` with a
//! bearer token. The API answers `204 No Content` on success and `404` when
//! the droplet is already gone.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ComputeError, ComputeResult};
use crate::provider::{ComputeProvider, DropletId};

/// Public API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com";

/// Connection settings for [`DigitalOceanClient`].
#[derive(Debug, Clone)]
pub struct DigitalOceanConfig {
    /// Personal access token (`digital_ocean_auth`).
    pub token: String,
    /// API base URL, without the `/v2` suffix.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl DigitalOceanConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body returned by the API (`{"id": "not_found", "message": "..."}`).
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
}

/// Client for the DigitalOcean droplet API.
#[derive(Debug, Clone)]
pub struct DigitalOceanClient {
    http: reqwest::Client,
    base: reqwest::Url,
    token: String,
}

impl DigitalOceanClient {
    /// Build a client. No request is made until the first call.
    pub fn new(config: DigitalOceanConfig) -> ComputeResult<Self> {
        if config.token.trim().is_empty() {
            return Err(ComputeError::Config("access token is empty".into()));
        }
        let mut api_url = config.api_url.clone();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        let base = reqwest::Url::parse(&api_url)
            .map_err(|e| ComputeError::Config(format!("invalid API URL: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ComputeError::Config(format!("failed to build HTTP client: {e}")))?;

        info!(api_url = %base, "digital ocean client ready");
        Ok(Self {
            http,
            base,
            token: config.token,
        })
    }

    fn droplet_url(&self, id: DropletId) -> ComputeResult<reqwest::Url> {
        self.base
            .join(&format!("v2/droplets/{id}"))
            .map_err(|e| ComputeError::Config(format!("invalid droplet URL: {e}")))
    }
}

#[async_trait]
impl ComputeProvider for DigitalOceanClient {
    async fn terminate_instance(&self, id: DropletId) -> ComputeResult<()> {
        let url = self.droplet_url(id)?;
        debug!(droplet_id = id, %url, "destroying droplet");

        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ComputeError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) if !err.message.is_empty() => format!("{} ({})", err.message, err.id),
            _ => body,
        };
        Err(ComputeError::from_status(id, status.as_u16(), message))
    }
}
