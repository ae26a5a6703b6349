//! Notification values handed to the delivery collaborator.
//!
//! Notifications are pure data. Everything a renderer needs is copied out of
//! the snapshot at match time, so a notification stays meaningful after the
//! snapshot it came from has been replaced.

use crate::server::{DestinationId, GameMode, ServerIdentity};
use crate::snapshot::ServerSnapshot;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

/// Which rule produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    UnderThreshold,
    OverThreshold,
    Sustained,
    WatchedLeft,
    WatchedEntered,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnderThreshold => "under_threshold",
            Self::OverThreshold => "over_threshold",
            Self::Sustained => "sustained",
            Self::WatchedLeft => "watched_left",
            Self::WatchedEntered => "watched_entered",
        };
        f.write_str(name)
    }
}

/// Server facts needed to format a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSummary {
    pub identity: ServerIdentity,
    pub name: String,
    pub map: String,
    pub game_mode: GameMode,
    pub population: u32,
    pub players: Vec<String>,
}

impl ServerSummary {
    pub fn of(snapshot: &ServerSnapshot) -> Self {
        Self {
            identity: snapshot.identity(),
            name: snapshot.info().plain_name(),
            map: snapshot.info().plain_map(),
            game_mode: snapshot.info().game_mode,
            population: snapshot.population(),
            players: snapshot.info().human_names(),
        }
    }

    /// Name to show, falling back to the address for unnamed servers.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.identity.to_string()
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub server: ServerSummary,
    /// Set for watched-player notifications only.
    pub player: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl Notification {
    pub fn server_event(kind: NotificationKind, snapshot: &ServerSnapshot) -> Self {
        Self {
            kind,
            server: ServerSummary::of(snapshot),
            player: None,
            observed_at: snapshot.captured_at(),
        }
    }

    pub fn player_event(
        kind: NotificationKind,
        snapshot: &ServerSnapshot,
        player: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            server: ServerSummary::of(snapshot),
            player: Some(player.into()),
            observed_at: snapshot.captured_at(),
        }
    }

    pub fn is_watched_left(&self) -> bool {
        self.kind == NotificationKind::WatchedLeft
    }

    pub fn is_watched_entered(&self) -> bool {
        self.kind == NotificationKind::WatchedEntered
    }
}

/// A decided notification together with the destinations it goes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub notification: Notification,
    pub destinations: BTreeSet<DestinationId>,
}

impl Dispatch {
    pub fn new(notification: Notification, destinations: BTreeSet<DestinationId>) -> Self {
        Self {
            notification,
            destinations,
        }
    }

    pub fn destination_list(&self) -> Vec<DestinationId> {
        self.destinations.iter().cloned().collect()
    }
}
