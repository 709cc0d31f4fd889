//! Discord bot connection.
//!
//! Connecting verifies the bot token against the REST API and resolves the
//! bot's own user. Gateway events are handled elsewhere.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{IntegrationError, IntegrationResult};

/// Discord REST API base.
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// The bot account behind a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotUser {
    pub id: String,
    pub username: String,
}

/// An authenticated bot session.
#[derive(Debug, Clone)]
pub struct DiscordBot {
    http: reqwest::Client,
    api_url: String,
    token: String,
    user: BotUser,
}

impl DiscordBot {
    /// Authenticate with the bot token and wait until the bot's identity is
    /// known.
    pub async fn connect(token: &str, api_url: &str) -> IntegrationResult<Self> {
        if token.trim().is_empty() {
            return Err(IntegrationError::MissingSetting("discord.bot_token".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        let api_url = api_url.trim_end_matches('/').to_string();

        let resp = http
            .get(format!("{api_url}/users/@me"))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {token}"))
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
        let user: BotUser = resp.json().await?;

        info!(bot = %user.username, id = %user.id, "connected to discord");
        Ok(Self {
            http,
            api_url,
            token: token.to_string(),
            user,
        })
    }

    pub fn user(&self) -> &BotUser {
        &self.user
    }

    /// Post a plain text message to a channel.
    pub async fn send_message(&self, channel_id: &str, content: &str) -> IntegrationResult<()> {
        let resp = self
            .http
            .post(format!("{}/channels/{channel_id}/messages", self.api_url))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": content }))
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
        Ok(())
    }
}
