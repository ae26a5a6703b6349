// Notification Delivery
//
// Bridges the engine's `Delivery` seam to a channel adapter: render once,
// post to every destination, report whether all of them succeeded.

use crate::adapter::{ChannelAdapter, MessageTarget};
use crate::render::render;
use async_trait::async_trait;
use ratstalker_core::{Delivery, DestinationId, Notification};
use std::sync::Arc;

pub struct ChannelDelivery<A: ChannelAdapter + ?Sized> {
    adapter: Arc<A>,
}

impl<A: ChannelAdapter + ?Sized> ChannelDelivery<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }
}

#[async_trait]
impl<A: ChannelAdapter + ?Sized> Delivery for ChannelDelivery<A> {
    async fn send_all(&self, notification: &Notification, destinations: &[DestinationId]) -> bool {
        let content = render(notification);
        let mut all_ok = true;
        for destination in destinations {
            let target = MessageTarget::Room(destination.as_str().to_string());
            if let Err(e) = self.adapter.send_message(&target, &content).await {
                all_ok = false;
                tracing::warn!(
                    platform = self.adapter.platform_name(),
                    destination = %destination,
                    kind = %notification.kind,
                    error = %e,
                    "Delivery failed"
                );
            }
        }
        all_ok
    }
}
