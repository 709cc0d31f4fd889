//! RudderStack analytics client.
//!
//! Events go to the data plane's HTTP API (`POST /v1/track`), authenticated
//! with the write key as the basic-auth user name.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{IntegrationError, IntegrationResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackEvent<'a> {
    user_id: String,
    event: &'a str,
    properties: &'a Value,
    context: Context,
}

#[derive(Debug, Serialize)]
struct Context {
    library: Library,
}

#[derive(Debug, Serialize)]
struct Library {
    name: &'static str,
    version: &'static str,
}

/// Handle to the analytics data plane.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    http: reqwest::Client,
    track_url: reqwest::Url,
    write_key: String,
}

impl AnalyticsClient {
    /// Validate the settings and build the client. No request is made.
    pub fn connect(write_key: &str, data_plane_url: &str) -> IntegrationResult<Self> {
        if write_key.trim().is_empty() {
            return Err(IntegrationError::MissingSetting("analytics.write_key".into()));
        }
        let invalid = |reason: String| IntegrationError::InvalidUrl {
            url: data_plane_url.to_string(),
            reason,
        };

        let base = reqwest::Url::parse(data_plane_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", base.scheme())));
        }
        let track_url = base.join("v1/track").map_err(|e| invalid(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        info!(%track_url, "connected to analytics");
        Ok(Self {
            http,
            track_url,
            write_key: write_key.to_string(),
        })
    }

    /// Record an event for a player.
    pub async fn track(&self, user_id: Uuid, event: &str, properties: &Value) -> IntegrationResult<()> {
        let body = TrackEvent {
            user_id: user_id.to_string(),
            event,
            properties,
            context: Context {
                library: Library {
                    name: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                },
            },
        };

        let resp = self
            .http
            .post(self.track_url.clone())
            .basic_auth(&self.write_key, Some(""))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IntegrationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(%event, %user_id, "analytics event sent");
        Ok(())
    }
}
