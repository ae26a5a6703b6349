//! Watch List
//!
//! Per-destination sets of player names. Built from configuration and
//! consulted by the watched-player rules through `WatchListSource`.

use crate::collaborator::WatchListSource;
use crate::server::DestinationId;
use std::collections::{BTreeMap, BTreeSet};

/// In-memory watch list keyed by destination.
///
/// Names are matched exactly against colour-stripped player names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchList {
    entries: BTreeMap<DestinationId, BTreeSet<String>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `watch:` configuration section.
    pub fn from_config(watch: &BTreeMap<String, Vec<String>>) -> Self {
        let mut list = Self::new();
        for (destination, names) in watch {
            for name in names {
                list.add(DestinationId::new(destination.as_str()), name);
            }
        }
        list
    }

    /// Returns `false` if the name was already watched by this destination.
    pub fn add(&mut self, destination: DestinationId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.entries
            .entry(destination)
            .or_default()
            .insert(name.to_string())
    }

    pub fn remove(&mut self, destination: &DestinationId, name: &str) -> bool {
        let Some(names) = self.entries.get_mut(destination) else {
            return false;
        };
        let removed = names.remove(name.trim());
        if names.is_empty() {
            self.entries.remove(destination);
        }
        removed
    }

    pub fn names_for(&self, destination: &DestinationId) -> BTreeSet<String> {
        self.entries.get(destination).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WatchListSource for WatchList {
    fn destinations_watching(&self, name: &str) -> BTreeSet<DestinationId> {
        self.entries
            .iter()
            .filter(|(_, names)| names.contains(name))
            .map(|(destination, _)| destination.clone())
            .collect()
    }
}
