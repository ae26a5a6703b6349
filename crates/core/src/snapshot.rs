//! Server and global snapshots.
//!
//! A [`GlobalSnapshot`] is the result of one poll cycle. It is built by
//! [`GlobalSnapshot::capture`], which threads every server's carried
//! [`RuleState`] forward from the previous cycle, then diffed against that
//! previous cycle by [`GlobalSnapshot::diff`]. After the diff it is only
//! read: it gets published as the current snapshot and becomes the previous
//! snapshot of the next cycle.
//!
//! Servers missing from a poll are dropped, not zeroed. A host that stops
//! answering produces no under-threshold or watched-left events; if it comes
//! back later it is compared against a zero-population dummy like any newly
//! seen server.

use crate::collaborator::{ServerQuery, WatchListSource};
use crate::notification::{Dispatch, Notification};
use crate::rules::{RuleMatch, RuleSettings};
use crate::server::{DestinationId, GameMode, ServerIdentity, ServerInfo};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::time::Duration;

/// Rule timestamps carried from one poll to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleState {
    pub last_threshold_crossing: DateTime<Utc>,
    pub last_sustained_notice: DateTime<Utc>,
}

impl RuleState {
    /// State for a server seen for the first time at `at`.
    pub fn fresh(at: DateTime<Utc>) -> Self {
        Self {
            last_threshold_crossing: at,
            last_sustained_notice: at,
        }
    }
}

/// Selects the threshold applied to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Standard,
    HighCapacity,
    HeadToHead,
}

impl Variant {
    /// The name marker wins over the game mode.
    pub fn classify(info: &ServerInfo, high_capacity_marker: &str) -> Self {
        let marker = high_capacity_marker.trim().to_lowercase();
        if !marker.is_empty() && info.plain_name().to_lowercase().contains(&marker) {
            Self::HighCapacity
        } else if info.game_mode.is_head_to_head() {
            Self::HeadToHead
        } else {
            Self::Standard
        }
    }
}

// ============================================================================
// Server Snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSnapshot {
    identity: ServerIdentity,
    info: ServerInfo,
    captured_at: DateTime<Utc>,
    rule_state: RuleState,
    variant: Variant,
}

impl ServerSnapshot {
    pub fn new(
        info: ServerInfo,
        captured_at: DateTime<Utc>,
        rule_state: RuleState,
        variant: Variant,
    ) -> Self {
        Self {
            identity: info.identity(),
            info,
            captured_at,
            rule_state,
            variant,
        }
    }

    /// Zero-population stand-in for a server without a prior observation.
    pub fn dummy(identity: ServerIdentity, at: DateTime<Utc>) -> Self {
        let info = ServerInfo {
            address: identity.address(),
            name: String::new(),
            map: String::new(),
            game_mode: GameMode::Other(0),
            max_clients: 0,
            players: Vec::new(),
        };
        Self {
            identity,
            info,
            captured_at: at,
            rule_state: RuleState::fresh(at),
            variant: Variant::Standard,
        }
    }

    pub fn identity(&self) -> ServerIdentity {
        self.identity
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn rule_state(&self) -> &RuleState {
        &self.rule_state
    }

    pub(crate) fn rule_state_mut(&mut self) -> &mut RuleState {
        &mut self.rule_state
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn population(&self) -> u32 {
        self.info.num_humans()
    }

    /// Evaluate this variant's rules against `prev` (or a dummy).
    ///
    /// Matching rules apply their state change to `self` before the next rule
    /// runs. Evaluating a clone leaves the original untouched, so replaying
    /// the same pair yields the same matches.
    pub fn compare(
        &mut self,
        prev: Option<&ServerSnapshot>,
        settings: &RuleSettings,
        watch: &dyn WatchListSource,
    ) -> Vec<RuleMatch> {
        let dummy;
        let prev = match prev {
            Some(prev) => prev,
            None => {
                dummy = Self::dummy(self.identity, self.captured_at);
                &dummy
            }
        };

        let mut matches = Vec::new();
        for rule in self.variant.rules(settings) {
            let found = rule.evaluate(prev, self, watch);
            if !found.is_empty() {
                tracing::debug!(
                    server = %self.identity,
                    kind = %rule.kind(),
                    count = found.len(),
                    "Rule matched"
                );
                rule.post_match(self);
                matches.extend(found);
            }
        }
        matches
    }
}

// ============================================================================
// Global Snapshot
// ============================================================================

/// Everything observed during one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSnapshot {
    captured_at: DateTime<Utc>,
    servers: HashMap<ServerIdentity, ServerSnapshot>,
}

/// Query parameters for one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureParams {
    pub hosts: Vec<SocketAddr>,
    pub timeout: Duration,
    pub retries: u32,
}

/// Collaborators consulted while diffing.
pub struct DiffContext<'a> {
    pub settings: &'a RuleSettings,
    pub watch: &'a dyn WatchListSource,
    /// Destinations of server-wide events.
    pub broadcast: &'a BTreeSet<DestinationId>,
}

impl GlobalSnapshot {
    /// Snapshot with no servers, used before the first poll.
    pub fn empty(at: DateTime<Utc>) -> Self {
        Self {
            captured_at: at,
            servers: HashMap::new(),
        }
    }

    /// Query every host once and build the next snapshot.
    ///
    /// A query that returns nothing yields an empty snapshot.
    pub async fn capture(
        prev: &GlobalSnapshot,
        query: &dyn ServerQuery,
        params: &CaptureParams,
        settings: &RuleSettings,
    ) -> Self {
        let infos = query
            .query_all(&params.hosts, params.timeout, params.retries)
            .await;
        if infos.is_empty() && !params.hosts.is_empty() {
            tracing::warn!(hosts = params.hosts.len(), "No server answered this cycle");
        }
        Self::from_infos(prev, infos, Utc::now(), settings)
    }

    /// Build a snapshot from already queried infos, carrying rule state over
    /// from `prev` by identity.
    pub fn from_infos(
        prev: &GlobalSnapshot,
        infos: Vec<ServerInfo>,
        captured_at: DateTime<Utc>,
        settings: &RuleSettings,
    ) -> Self {
        let mut servers = HashMap::with_capacity(infos.len());
        for info in infos {
            let identity = info.identity();
            let rule_state = prev
                .servers
                .get(&identity)
                .map(|s| s.rule_state.clone())
                .unwrap_or_else(|| RuleState::fresh(captured_at));
            let variant = Variant::classify(&info, &settings.high_capacity_marker);
            let snapshot = ServerSnapshot::new(info, captured_at, rule_state, variant);
            if servers.insert(identity, snapshot).is_some() {
                tracing::debug!(server = %identity, "Duplicate answer, keeping the last one");
            }
        }
        Self {
            captured_at,
            servers,
        }
    }

    /// Evaluate every server against its previous observation.
    ///
    /// Applies the rule state changes to `self` and returns the decided
    /// notifications in server iteration order, which is unspecified.
    pub fn diff(&mut self, prev: &GlobalSnapshot, ctx: &DiffContext<'_>) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();
        for (identity, snapshot) in self.servers.iter_mut() {
            let matches = snapshot.compare(prev.servers.get(identity), ctx.settings, ctx.watch);
            for found in matches {
                let dispatch = match found {
                    RuleMatch::Server(kind) => {
                        Dispatch::new(Notification::server_event(kind, snapshot), ctx.broadcast.clone())
                    }
                    RuleMatch::Player {
                        kind,
                        name,
                        destinations,
                    } => Dispatch::new(Notification::player_event(kind, snapshot, name), destinations),
                };
                dispatches.push(dispatch);
            }
        }
        dispatches
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, identity: &ServerIdentity) -> Option<&ServerSnapshot> {
        self.servers.get(identity)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerSnapshot> {
        self.servers.values()
    }

    // ------------------------------------------------------------------------
    // Read helpers for on-demand lookups
    // ------------------------------------------------------------------------

    /// Servers sorted by name, empty ones only if `show_empty`.
    pub fn servers(&self, show_empty: bool) -> Vec<&ServerSnapshot> {
        let mut servers: Vec<&ServerSnapshot> = self
            .servers
            .values()
            .filter(|s| show_empty || s.population() > 0)
            .collect();
        servers.sort_by(|a, b| {
            a.info
                .plain_name()
                .to_lowercase()
                .cmp(&b.info.plain_name().to_lowercase())
                .then(a.identity.cmp(&b.identity))
        });
        servers
    }

    /// Servers whose name, map or mode contains any keyword.
    pub fn search(&self, keywords: &[String], show_empty: bool) -> Vec<&ServerSnapshot> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self.servers(show_empty)
            .into_iter()
            .filter(|s| {
                if keywords.is_empty() {
                    return true;
                }
                let haystack = format!(
                    "{} {} {}",
                    s.info.plain_name(),
                    s.info.plain_map(),
                    s.info.game_mode
                )
                .to_lowercase();
                keywords.iter().any(|k| haystack.contains(k))
            })
            .collect()
    }

    /// Servers where any player name contains any of `names`.
    pub fn hunt(&self, names: &[String]) -> Vec<&ServerSnapshot> {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Vec::new();
        }
        self.servers(false)
            .into_iter()
            .filter(|s| {
                s.info
                    .human_names()
                    .iter()
                    .map(|p| p.to_lowercase())
                    .any(|p| names.iter().any(|n| p.contains(n)))
            })
            .collect()
    }
}
