//! Monitor Loop
//!
//! Drives the engine: capture, diff, sequence, deliver, publish, sleep.
//!
//! The loop is a two-state machine. In `Idle` it waits for the enable flag;
//! in `Polling` it runs one full cycle and then sleeps for the configured
//! interval. A disable or a shutdown request is only observed at those two
//! suspension points, so a cycle that has started always delivers its
//! notifications and publishes its snapshot.
//!
//! Only the loop writes the current snapshot. Readers go through
//! [`MonitorHandle::current_snapshot`] and never block the loop.

use crate::collaborator::{Delivery, ServerQuery, WatchListSource};
use crate::config::Config;
use crate::error::RatStalkerError;
use crate::rules::RuleSettings;
use crate::sequencer::NotificationSequencer;
use crate::server::DestinationId;
use crate::snapshot::{CaptureParams, DiffContext, GlobalSnapshot};
use arc_swap::ArcSwap;
use chrono::Utc;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Settings
// ============================================================================

/// Everything the loop needs from configuration, with hosts resolved.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub capture: CaptureParams,
    pub rules: RuleSettings,
    /// Destinations of server-wide notifications
    pub broadcast: BTreeSet<DestinationId>,
}

impl MonitorSettings {
    /// Build settings from a validated config, resolving every host once.
    pub async fn from_config(config: &Config) -> Result<Self, RatStalkerError> {
        let hosts = resolve_hosts(config).await?;
        Ok(Self {
            enabled: config.monitor.enabled,
            interval: config.monitor.interval(),
            capture: CaptureParams {
                hosts,
                timeout: config.query.timeout(),
                retries: config.query.retries,
            },
            rules: config.rule_settings(),
            broadcast: config.delivery.broadcast(),
        })
    }
}

/// Resolve every configured host to its first socket address.
pub async fn resolve_hosts(config: &Config) -> Result<Vec<SocketAddr>, RatStalkerError> {
    let mut hosts = Vec::with_capacity(config.query.hosts.len());
    for host in &config.query.hosts {
        let address = host.address_with_port();
        let resolved = tokio::net::lookup_host(address.as_str())
            .await
            .map_err(|e| RatStalkerError::resolve_error(host.label(), e.to_string()))?
            .next()
            .ok_or_else(|| RatStalkerError::resolve_error(host.label(), "no addresses"))?;
        tracing::debug!(host = host.label(), address = %resolved, "Resolved game server");
        if !hosts.contains(&resolved) {
            hosts.push(resolved);
        }
    }
    Ok(hosts)
}

// ============================================================================
// Snapshot Store
// ============================================================================

/// The shared "most recently completed" snapshot.
///
/// Swapped as a whole; a reader sees either the old or the new snapshot.
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<GlobalSnapshot>,
}

impl SnapshotStore {
    pub fn new(initial: GlobalSnapshot) -> Self {
        Self {
            current: ArcSwap::new(Arc::new(initial)),
        }
    }

    pub fn load(&self) -> Arc<GlobalSnapshot> {
        self.current.load_full()
    }

    fn publish(&self, snapshot: GlobalSnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Control surface of a running loop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    control: Arc<watch::Sender<bool>>,
    store: Arc<SnapshotStore>,
    cancel: CancellationToken,
}

impl MonitorHandle {
    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    fn set_enabled(&self, enabled: bool) {
        let changed = self.control.send_if_modified(|current| {
            let changed = *current != enabled;
            *current = enabled;
            changed
        });
        if changed {
            tracing::info!(enabled, "Monitoring toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self.control.borrow()
    }

    /// Latest completed snapshot. Never triggers a poll.
    pub fn current_snapshot(&self) -> Arc<GlobalSnapshot> {
        self.store.load()
    }

    /// Ask the loop to stop at its next suspension point.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ============================================================================
// Loop
// ============================================================================

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub cycles: u64,
    pub notifications: u64,
    pub delivery_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Idle,
    Polling,
}

pub struct MonitorLoop {
    settings: MonitorSettings,
    query: Arc<dyn ServerQuery>,
    delivery: Arc<dyn Delivery>,
    watchlist: Arc<dyn WatchListSource>,
    control: watch::Receiver<bool>,
    store: Arc<SnapshotStore>,
    cancel: CancellationToken,
}

impl MonitorLoop {
    pub fn new(
        settings: MonitorSettings,
        query: Arc<dyn ServerQuery>,
        delivery: Arc<dyn Delivery>,
        watchlist: Arc<dyn WatchListSource>,
    ) -> (Self, MonitorHandle) {
        let (control_tx, control_rx) = watch::channel(settings.enabled);
        let store = Arc::new(SnapshotStore::new(GlobalSnapshot::empty(Utc::now())));
        let cancel = CancellationToken::new();

        let handle = MonitorHandle {
            control: Arc::new(control_tx),
            store: store.clone(),
            cancel: cancel.clone(),
        };
        let monitor = Self {
            settings,
            query,
            delivery,
            watchlist,
            control: control_rx,
            store,
            cancel,
        };
        (monitor, handle)
    }

    /// Run until shutdown is requested or every handle is dropped.
    pub async fn run(mut self) -> MonitorReport {
        let mut report = MonitorReport::default();
        let mut state = if *self.control.borrow_and_update() {
            LoopState::Polling
        } else {
            LoopState::Idle
        };
        tracing::info!(
            hosts = self.settings.capture.hosts.len(),
            interval_secs = self.settings.interval.as_secs(),
            "Monitor loop started"
        );

        loop {
            state = match state {
                LoopState::Idle => {
                    tracing::info!("Monitoring disabled, waiting");
                    match self.wait_until(true).await {
                        Some(true) => LoopState::Polling,
                        _ => break,
                    }
                }
                LoopState::Polling => {
                    self.cycle(&mut report).await;
                    match self.sleep().await {
                        Some(true) => LoopState::Polling,
                        Some(false) => LoopState::Idle,
                        None => break,
                    }
                }
            };
        }

        tracing::info!(
            cycles = report.cycles,
            notifications = report.notifications,
            delivery_failures = report.delivery_failures,
            "Monitor loop stopped"
        );
        report
    }

    /// Wait for the enable flag to become `enabled`.
    ///
    /// Returns `None` on shutdown or when all handles are gone.
    async fn wait_until(&mut self, enabled: bool) -> Option<bool> {
        let control = &mut self.control;
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => None,

            changed = async { control.wait_for(|e| *e == enabled).await.map(|_| ()) } => {
                match changed {
                    Ok(()) => Some(enabled),
                    Err(_) => {
                        tracing::info!("All monitor handles dropped, stopping");
                        None
                    }
                }
            }
        }
    }

    /// Sleep for one interval. A disable ends the sleep early.
    ///
    /// Returns whether to keep polling, or `None` to stop.
    async fn sleep(&mut self) -> Option<bool> {
        let interval = self.settings.interval;
        let control = &mut self.control;
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => None,

            changed = async { control.wait_for(|e| !*e).await.map(|_| ()) } => {
                match changed {
                    Ok(()) => Some(false),
                    Err(_) => {
                        tracing::info!("All monitor handles dropped, stopping");
                        None
                    }
                }
            }

            _ = tokio::time::sleep(interval) => Some(true),
        }
    }

    /// One complete poll cycle.
    async fn cycle(&self, report: &mut MonitorReport) {
        let cycle = report.cycles + 1;
        let prev = self.store.load();

        let mut next = GlobalSnapshot::capture(
            &prev,
            self.query.as_ref(),
            &self.settings.capture,
            &self.settings.rules,
        )
        .await;

        let ctx = DiffContext {
            settings: &self.settings.rules,
            watch: self.watchlist.as_ref(),
            broadcast: &self.settings.broadcast,
        };
        let sequencer: NotificationSequencer = next.diff(&prev, &ctx).into_iter().collect();
        let dispatches = sequencer.into_ordered();

        let mut failures = 0u64;
        for dispatch in &dispatches {
            let notification = &dispatch.notification;
            if dispatch.destinations.is_empty() {
                tracing::debug!(
                    cycle,
                    kind = %notification.kind,
                    server = %notification.server.identity,
                    "No destination for notification"
                );
                continue;
            }
            let delivered = self
                .delivery
                .send_all(notification, &dispatch.destination_list())
                .await;
            if !delivered {
                failures += 1;
                tracing::warn!(
                    cycle,
                    kind = %notification.kind,
                    server = %notification.server.identity,
                    destinations = dispatch.destinations.len(),
                    "Notification not delivered everywhere"
                );
            }
        }

        let servers = next.len();
        self.store.publish(next);

        report.cycles = cycle;
        report.notifications += dispatches.len() as u64;
        report.delivery_failures += failures;
        tracing::info!(
            cycle,
            servers,
            notifications = dispatches.len(),
            failures,
            "Poll cycle complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_swaps_whole_snapshot() {
        let first = GlobalSnapshot::empty(Utc::now());
        let store = SnapshotStore::new(first.clone());
        let held = store.load();

        let later = GlobalSnapshot::empty(first.captured_at() + chrono::TimeDelta::minutes(1));
        store.publish(later.clone());

        assert_eq!(*held, first);
        assert_eq!(*store.load(), later);
    }

    #[tokio::test]
    async fn test_resolve_hosts_dedups_and_defaults_port() {
        let mut config = Config::default();
        config.query.hosts = vec![
            crate::config::HostConfig {
                name: "a".into(),
                address: "127.0.0.1".into(),
            },
            crate::config::HostConfig {
                name: "b".into(),
                address: "127.0.0.1:27960".into(),
            },
            crate::config::HostConfig {
                name: "c".into(),
                address: "127.0.0.1:27961".into(),
            },
        ];

        let hosts = resolve_hosts(&config).await.unwrap();
        assert_eq!(
            hosts,
            vec![
                SocketAddr::from(([127, 0, 0, 1], 27960)),
                SocketAddr::from(([127, 0, 0, 1], 27961)),
            ]
        );
    }
}
