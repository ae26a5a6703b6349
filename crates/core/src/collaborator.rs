//! Collaborator Interfaces
//!
//! The engine talks to the outside world through these three seams only:
//! querying servers, delivering notifications and looking up who watches a
//! player. Concrete implementations live in the query and channels crates.

use crate::notification::Notification;
use crate::server::{DestinationId, ServerInfo};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

/// Queries a set of game servers for their live state.
#[async_trait]
pub trait ServerQuery: Send + Sync {
    /// Query every host once.
    ///
    /// Hosts that do not answer within `timeout` after `retries` extra
    /// attempts are simply absent from the result. Result order is
    /// unspecified.
    async fn query_all(&self, hosts: &[SocketAddr], timeout: Duration, retries: u32)
        -> Vec<ServerInfo>;
}

/// Delivers one notification to a set of destinations.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Returns `true` only if every destination accepted the message.
    async fn send_all(&self, notification: &Notification, destinations: &[DestinationId]) -> bool;
}

/// Answers which destinations are watching a player name.
pub trait WatchListSource: Send + Sync {
    fn destinations_watching(&self, name: &str) -> BTreeSet<DestinationId>;
}
