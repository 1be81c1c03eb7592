// =============================================================================
// Telegram Bot API Client
// =============================================================================
//
// SECURITY: the bot token is part of every request path.  It is never logged
// and `Debug` redacts it; request errors are stripped of the URL before they
// are wrapped.
// =============================================================================

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::types::{ApiResponse, OutgoingMessage, Update, User};

const API_BASE: &str = "https://api.telegram.org";

/// Anything that can deliver a reply to a chat.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> Result<()>;
}

/// Bot API client over HTTPS.
#[derive(Clone)]
pub struct TelegramClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_base_url(token, API_BASE, timeout)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// POST a Bot API method with a JSON body and unwrap the `result` field.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.client.post(self.method_url(method)).json(&body);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("Telegram {method} request failed"))?;

        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| e.without_url())
            .with_context(|| format!("failed to parse Telegram {method} response"))?;

        if !parsed.ok {
            bail!(
                "Telegram {} returned {}: {}",
                method,
                status,
                parsed.description.unwrap_or_default()
            );
        }

        parsed
            .result
            .with_context(|| format!("Telegram {method} response has no result"))
    }

    /// getMe — the bot's own account.
    #[instrument(skip(self), name = "telegram::get_me")]
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", json!({}), None).await
    }

    /// setWebhook with the secret Telegram echoes back in every delivery.
    #[instrument(skip(self, secret), name = "telegram::set_webhook")]
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "channel_post"],
        });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", body, None).await?;
        debug!("webhook registered");
        Ok(())
    }

    /// deleteWebhook so that getUpdates works.
    #[instrument(skip(self), name = "telegram::delete_webhook")]
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", json!({}), None).await?;
        Ok(())
    }

    /// getUpdates long poll.  Blocks up to `timeout_secs` server-side.
    #[instrument(skip(self), name = "telegram::get_updates")]
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "channel_post"],
        });
        // The HTTP timeout must outlast the long poll.
        let http_timeout = Duration::from_secs(timeout_secs + 10);
        self.call("getUpdates", body, Some(http_timeout)).await
    }

    /// sendMessage.  A Markdown message Telegram cannot parse is resent as
    /// plain text.
    #[instrument(skip(self, message), fields(chat_id = message.chat_id), name = "telegram::send_message")]
    pub async fn send_message(&self, message: &OutgoingMessage) -> Result<()> {
        let mut body = json!({
            "chat_id": message.chat_id,
            "text": message.text,
            "disable_web_page_preview": true,
        });
        if message.markdown {
            body["parse_mode"] = json!("Markdown");
        }

        match self.call::<serde_json::Value>("sendMessage", body, None).await {
            Ok(_) => Ok(()),
            Err(e) if message.markdown && e.to_string().contains("can't parse entities") => {
                warn!(error = %e, "markdown rejected, resending as plain text");
                let plain = json!({ "chat_id": message.chat_id, "text": message.text });
                self.call::<serde_json::Value>("sendMessage", plain, None).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.send_message(&message).await
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
