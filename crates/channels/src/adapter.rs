// Channel Adapter Interface
//
// Unified outbound interface for every place a notification can be posted.

use async_trait::async_trait;

/// Message target (where to send)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTarget {
    /// A chat room, by platform room id
    Room(String),
}

impl MessageTarget {
    pub fn id(&self) -> &str {
        match self {
            MessageTarget::Room(id) => id,
        }
    }
}

impl std::fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MessageTarget::Room(id) => write!(f, "room {}", id),
        }
    }
}

/// Message content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    /// Plain text body, always present
    pub text: String,
    /// Rich HTML body for platforms that render it
    pub html: Option<String>,
}

impl MessageContent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: None,
        }
    }
}

/// Unified channel adapter trait
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Platform name (e.g., "stdout", "matrix")
    fn platform_name(&self) -> &str;

    /// Send message to target
    async fn send_message(
        &self,
        target: &MessageTarget,
        content: &MessageContent,
    ) -> Result<(), ChannelError>;

    /// Check if adapter is healthy
    async fn health_check(&self) -> Result<bool, ChannelError>;
}

/// Channel error type
#[derive(Debug)]
pub enum ChannelError {
    SendFailed { target: MessageTarget, source: String },

    HealthCheckFailed { platform: String, source: String },

    AuthenticationFailed { platform: String, source: String },
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChannelError::SendFailed { target, source } => {
                write!(f, "Send failed to {}: {}", target, source)
            }
            ChannelError::HealthCheckFailed { platform, source } => {
                write!(f, "Health check failed for {}: {}", platform, source)
            }
            ChannelError::AuthenticationFailed { platform, source } => {
                write!(f, "Authentication failed for {}: {}", platform, source)
            }
        }
    }
}

impl std::error::Error for ChannelError {}
