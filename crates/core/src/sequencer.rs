//! Notification Sequencer
//!
//! Orders one poll cycle's notifications before delivery. Servers are
//! diffed in no particular order, so a player hopping from server A to
//! server B within one cycle could otherwise be announced on B before
//! leaving A. Every "left" goes out before every "entered"; threshold and
//! sustained notices follow.

use crate::notification::{Dispatch, NotificationKind};

#[derive(Debug, Default)]
pub struct NotificationSequencer {
    left: Vec<Dispatch>,
    entered: Vec<Dispatch>,
    other: Vec<Dispatch>,
}

impl NotificationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, dispatch: Dispatch) {
        match dispatch.notification.kind {
            NotificationKind::WatchedLeft => self.left.push(dispatch),
            NotificationKind::WatchedEntered => self.entered.push(dispatch),
            NotificationKind::OverThreshold
            | NotificationKind::UnderThreshold
            | NotificationKind::Sustained => self.other.push(dispatch),
        }
    }

    pub fn len(&self) -> usize {
        self.left.len() + self.entered.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `left ++ entered ++ other`, each bucket in arrival order.
    pub fn into_ordered(self) -> Vec<Dispatch> {
        let mut ordered = self.left;
        ordered.extend(self.entered);
        ordered.extend(self.other);
        ordered
    }
}

impl Extend<Dispatch> for NotificationSequencer {
    fn extend<T: IntoIterator<Item = Dispatch>>(&mut self, iter: T) {
        for dispatch in iter {
            self.push(dispatch);
        }
    }
}

impl FromIterator<Dispatch> for NotificationSequencer {
    fn from_iter<T: IntoIterator<Item = Dispatch>>(iter: T) -> Self {
        let mut sequencer = Self::new();
        sequencer.extend(iter);
        sequencer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Notification;
    use crate::rules::RuleSettings;
    use crate::server::{DestinationId, GameMode, Player, ServerInfo};
    use crate::snapshot::{DiffContext, GlobalSnapshot};
    use crate::watchlist::WatchList;
    use chrono::{DateTime, TimeDelta, Utc};
    use std::collections::BTreeSet;
    use std::net::SocketAddr;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn server(port: u16, players: &[&str]) -> ServerInfo {
        ServerInfo {
            address: SocketAddr::from(([192, 168, 1, 10], port)),
            name: format!("server-{}", port),
            map: "q3dm17".to_string(),
            game_mode: GameMode::Ffa,
            max_clients: 12,
            players: players
                .iter()
                .map(|n| Player {
                    name: n.to_string(),
                    score: 0,
                    ping: 80,
                })
                .collect(),
        }
    }

    fn kinds(dispatches: &[Dispatch]) -> Vec<NotificationKind> {
        dispatches.iter().map(|d| d.notification.kind).collect()
    }

    fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    /// One cycle where Anna hops from server 1 to server 2 and server 3
    /// crosses the threshold.
    fn hop_cycle() -> Vec<Dispatch> {
        let settings = RuleSettings::default();
        let mut watch = WatchList::new();
        watch.add("room-1".into(), "Anna");
        let broadcast = BTreeSet::from([DestinationId::from("room-1")]);
        let ctx = DiffContext {
            settings: &settings,
            watch: &watch,
            broadcast: &broadcast,
        };

        let empty = GlobalSnapshot::empty(at(0));
        let mut first = GlobalSnapshot::from_infos(
            &empty,
            vec![server(1, &["Anna"]), server(2, &[]), server(3, &[])],
            at(0),
            &settings,
        );
        first.diff(&empty, &ctx);

        let mut second = GlobalSnapshot::from_infos(
            &first,
            vec![server(1, &[]), server(2, &["Anna"]), server(3, &["a", "b", "c", "d"])],
            at(1),
            &settings,
        );
        second.diff(&first, &ctx)
    }

    #[test]
    fn test_left_before_entered_for_every_input_order() {
        let dispatches = hop_cycle();
        assert_eq!(dispatches.len(), 3);

        for order in permutations(&dispatches) {
            let out = order.into_iter().collect::<NotificationSequencer>().into_ordered();
            assert_eq!(
                kinds(&out),
                vec![
                    NotificationKind::WatchedLeft,
                    NotificationKind::WatchedEntered,
                    NotificationKind::OverThreshold,
                ]
            );
            assert_eq!(out[0].notification.server.name, "server-1");
            assert_eq!(out[1].notification.server.name, "server-2");
        }
    }

    #[test]
    fn test_buckets_keep_arrival_order() {
        let dispatches = hop_cycle();
        let over = dispatches
            .iter()
            .find(|d| d.notification.kind == NotificationKind::OverThreshold)
            .unwrap()
            .clone();

        let mut first = over.clone();
        first.notification.server.name = "first".to_string();
        let mut second = over.clone();
        second.notification.kind = NotificationKind::Sustained;
        second.notification.server.name = "second".to_string();
        let mut third = over;
        third.notification.kind = NotificationKind::UnderThreshold;
        third.notification.server.name = "third".to_string();

        let mut sequencer = NotificationSequencer::new();
        sequencer.push(first);
        sequencer.push(second);
        sequencer.push(third);
        assert_eq!(sequencer.len(), 3);

        let names: Vec<String> = sequencer
            .into_ordered()
            .into_iter()
            .map(|d| d.notification.server.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_many_left_and_entered() {
        let template = hop_cycle();
        let left = template
            .iter()
            .find(|d| d.notification.is_watched_left())
            .unwrap()
            .clone();
        let entered = template
            .iter()
            .find(|d| d.notification.is_watched_entered())
            .unwrap()
            .clone();

        let named = |d: &Dispatch, player: &str| {
            let mut d = d.clone();
            d.notification = Notification {
                player: Some(player.to_string()),
                ..d.notification
            };
            d
        };

        let input = vec![
            named(&entered, "e1"),
            named(&left, "l1"),
            named(&entered, "e2"),
            named(&left, "l2"),
        ];
        let out = input.into_iter().collect::<NotificationSequencer>().into_ordered();
        let players: Vec<String> = out.iter().filter_map(|d| d.notification.player.clone()).collect();
        assert_eq!(players, vec!["l1", "l2", "e1", "e2"]);
    }

    #[test]
    fn test_empty_cycle() {
        let sequencer = NotificationSequencer::new();
        assert!(sequencer.is_empty());
        assert!(sequencer.into_ordered().is_empty());
    }
}
