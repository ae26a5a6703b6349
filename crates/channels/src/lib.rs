// Channel Adapters for Notification Delivery
//
// This crate implements adapters for stdout and Matrix, plus the bridge
// that turns engine notifications into channel messages.

pub mod adapter;
pub mod delivery;
pub mod platforms;
pub mod render;

pub use adapter::{ChannelAdapter, ChannelError, MessageContent, MessageTarget};
pub use delivery::ChannelDelivery;
pub use platforms::matrix::{MatrixAdapter, MatrixSettings};
pub use platforms::stdout::StdoutAdapter;
pub use render::{render, render_server_list};

use ratstalker_core::config::{DeliveryConfig, Platform};
use std::sync::Arc;
use std::time::Duration;

/// Build the adapter selected by the `delivery` config section.
pub fn adapter_from_config(
    config: &DeliveryConfig,
) -> Result<Arc<dyn ChannelAdapter>, ChannelError> {
    match config.platform {
        Platform::Stdout => Ok(Arc::new(StdoutAdapter::new())),
        Platform::Matrix => {
            let access_token = config.matrix.resolve_token().ok_or_else(|| {
                ChannelError::AuthenticationFailed {
                    platform: "matrix".to_string(),
                    source: format!(
                        "set delivery.matrix.access_token or {}",
                        ratstalker_core::config::MATRIX_TOKEN_ENV
                    ),
                }
            })?;
            let adapter = MatrixAdapter::new(MatrixSettings {
                homeserver: config.matrix.homeserver.clone(),
                access_token,
                timeout: Duration::from_secs(10),
            })?;
            Ok(Arc::new(adapter))
        }
    }
}
