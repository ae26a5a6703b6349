// Matrix Platform Adapter
//
// Posts notices to Matrix rooms through the client-server HTTP API.

use crate::adapter::{ChannelAdapter, ChannelError, MessageContent, MessageTarget};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Matrix adapter configuration
#[derive(Debug, Clone)]
pub struct MatrixSettings {
    /// Homeserver base URL, e.g. `https://matrix.example.org`
    pub homeserver: String,
    /// Access token of the bot account
    pub access_token: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// `m.room.message` event body
#[derive(Debug, Serialize)]
struct RoomMessage<'a> {
    msgtype: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted_body: Option<&'a str>,
}

impl<'a> RoomMessage<'a> {
    fn notice(content: &'a MessageContent) -> Self {
        Self {
            msgtype: "m.notice",
            body: &content.text,
            format: content.html.as_ref().map(|_| "org.matrix.custom.html"),
            formatted_body: content.html.as_deref(),
        }
    }
}

/// Matrix adapter
pub struct MatrixAdapter {
    settings: MatrixSettings,
    client: Client,
}

impl MatrixAdapter {
    /// Create new Matrix adapter
    pub fn new(settings: MatrixSettings) -> Result<Self, ChannelError> {
        if settings.access_token.is_empty() {
            return Err(ChannelError::AuthenticationFailed {
                platform: "matrix".to_string(),
                source: "no access token configured".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Ok(Self { settings, client })
    }

    fn base(&self) -> &str {
        self.settings.homeserver.trim_end_matches('/')
    }

    /// URL of the send endpoint for one room and transaction
    pub fn send_url(&self, room_id: &str, txn_id: &str) -> String {
        format!(
            "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            self.base(),
            urlencoding::encode(room_id),
            urlencoding::encode(txn_id)
        )
    }
}

#[async_trait]
impl ChannelAdapter for MatrixAdapter {
    fn platform_name(&self) -> &str {
        "matrix"
    }

    async fn send_message(
        &self,
        target: &MessageTarget,
        content: &MessageContent,
    ) -> Result<(), ChannelError> {
        let txn_id = uuid::Uuid::new_v4().to_string();
        let url = self.send_url(target.id(), &txn_id);
        let send_failed = |source: String| ChannelError::SendFailed {
            target: target.clone(),
            source,
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.settings.access_token)
            .json(&RoomMessage::notice(content))
            .send()
            .await
            .map_err(|e| send_failed(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ChannelError::AuthenticationFailed {
                platform: "matrix".to_string(),
                source: "access token rejected".to_string(),
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(send_failed(format!("homeserver error {}: {}", status, error_text)));
        }

        tracing::debug!(room = target.id(), txn = %txn_id, "Matrix notice sent");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        let url = format!("{}/_matrix/client/v3/account/whoami", self.base());
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .send()
            .await
            .map_err(|e| ChannelError::HealthCheckFailed {
                platform: "matrix".to_string(),
                source: e.to_string(),
            })?;
        Ok(response.status().is_success())
    }
}
