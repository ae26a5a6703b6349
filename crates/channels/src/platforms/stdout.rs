// Stdout Platform Adapter
//
// Prints notifications to standard output. Default for local runs.

use crate::adapter::{ChannelAdapter, ChannelError, MessageContent, MessageTarget};
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct StdoutAdapter;

impl StdoutAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Line printed for one target
    pub fn format_line(target: &MessageTarget, content: &MessageContent) -> String {
        format!("[{}] {}", target.id(), content.text)
    }
}

#[async_trait]
impl ChannelAdapter for StdoutAdapter {
    fn platform_name(&self) -> &str {
        "stdout"
    }

    async fn send_message(
        &self,
        target: &MessageTarget,
        content: &MessageContent,
    ) -> Result<(), ChannelError> {
        println!("{}", Self::format_line(target, content));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_always_succeeds() {
        let adapter = StdoutAdapter::new();
        let target = MessageTarget::Room("!a:example.org".to_string());
        let content = MessageContent::plain("[-] arena: 0 players now");

        assert_eq!(
            StdoutAdapter::format_line(&target, &content),
            "[!a:example.org] [-] arena: 0 players now"
        );
        tokio_test::block_on(async {
            assert!(adapter.send_message(&target, &content).await.is_ok());
            assert!(adapter.health_check().await.unwrap());
        });
    }
}
