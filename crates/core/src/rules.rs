//! Relevance rules.
//!
//! A rule is a predicate over a `(previous, current)` pair of server
//! snapshots. Threshold and sustained rules also update the current
//! snapshot's carried [`RuleState`](crate::snapshot::RuleState) when they
//! match; watched-player rules are stateless.
//!
//! Rules are evaluated in a fixed order (see [`Variant::rules`]) and each
//! rule sees the state left by the rules before it. That is what keeps
//! `Sustained` quiet on the same poll an `OverThreshold` edge fires.

use crate::collaborator::WatchListSource;
use crate::notification::NotificationKind;
use crate::server::DestinationId;
use crate::snapshot::{ServerSnapshot, Variant};
use chrono::TimeDelta;
use std::collections::BTreeSet;

/// Default population thresholds per variant
pub const DEFAULT_STANDARD_THRESHOLD: u32 = 4;
pub const DEFAULT_HIGH_CAPACITY_THRESHOLD: u32 = 8;
pub const DEFAULT_HEAD_TO_HEAD_THRESHOLD: u32 = 1;
/// Default minimum time between sustained notices (seconds)
pub const DEFAULT_SUSTAINED_INTERVAL_SECS: u64 = 30 * 60;
/// Default name marker for high-capacity servers
pub const DEFAULT_HIGH_CAPACITY_MARKER: &str = "city";

/// Parameters of the rule sets, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSettings {
    pub standard_threshold: u32,
    pub high_capacity_threshold: u32,
    pub head_to_head_threshold: u32,
    pub sustained_interval: TimeDelta,
    /// Case-insensitive substring of the server name selecting `HighCapacity`.
    pub high_capacity_marker: String,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            standard_threshold: DEFAULT_STANDARD_THRESHOLD,
            high_capacity_threshold: DEFAULT_HIGH_CAPACITY_THRESHOLD,
            head_to_head_threshold: DEFAULT_HEAD_TO_HEAD_THRESHOLD,
            sustained_interval: secs_to_delta(DEFAULT_SUSTAINED_INTERVAL_SECS),
            high_capacity_marker: DEFAULT_HIGH_CAPACITY_MARKER.to_string(),
        }
    }
}

pub(crate) fn secs_to_delta(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX)).unwrap_or(TimeDelta::MAX)
}

impl Variant {
    pub fn threshold(&self, settings: &RuleSettings) -> u32 {
        match self {
            Self::Standard => settings.standard_threshold,
            Self::HighCapacity => settings.high_capacity_threshold,
            Self::HeadToHead => settings.head_to_head_threshold,
        }
    }

    /// The rule set attached to this variant, in evaluation order.
    pub fn rules(&self, settings: &RuleSettings) -> [RelevanceRule; 5] {
        let threshold = self.threshold(settings);
        [
            RelevanceRule::UnderThreshold { threshold },
            RelevanceRule::OverThreshold { threshold },
            RelevanceRule::Sustained {
                threshold,
                interval: settings.sustained_interval,
            },
            RelevanceRule::WatchedLeft,
            RelevanceRule::WatchedEntered,
        ]
    }
}

/// One outcome of a rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    /// A server-wide event, broadcast to every configured destination.
    Server(NotificationKind),
    /// A watched player event, scoped to the destinations watching `name`.
    Player {
        kind: NotificationKind,
        name: String,
        destinations: BTreeSet<DestinationId>,
    },
}

impl RuleMatch {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::Server(kind) => *kind,
            Self::Player { kind, .. } => *kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelevanceRule {
    OverThreshold { threshold: u32 },
    UnderThreshold { threshold: u32 },
    Sustained { threshold: u32, interval: TimeDelta },
    WatchedEntered,
    WatchedLeft,
}

impl RelevanceRule {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::OverThreshold { .. } => NotificationKind::OverThreshold,
            Self::UnderThreshold { .. } => NotificationKind::UnderThreshold,
            Self::Sustained { .. } => NotificationKind::Sustained,
            Self::WatchedEntered => NotificationKind::WatchedEntered,
            Self::WatchedLeft => NotificationKind::WatchedLeft,
        }
    }

    /// Evaluate the rule without touching any state.
    pub fn evaluate(
        &self,
        prev: &ServerSnapshot,
        curr: &ServerSnapshot,
        watch: &dyn WatchListSource,
    ) -> Vec<RuleMatch> {
        let kind = self.kind();
        match self {
            Self::OverThreshold { threshold } => {
                let matched = prev.population() < *threshold && curr.population() >= *threshold;
                server_match(matched, kind)
            }
            Self::UnderThreshold { threshold } => {
                let matched = prev.population() >= *threshold && curr.population() < *threshold;
                server_match(matched, kind)
            }
            Self::Sustained {
                threshold,
                interval,
            } => {
                let now = curr.captured_at();
                let state = curr.rule_state();
                let matched = curr.population() >= *threshold
                    && now - state.last_sustained_notice >= *interval
                    && now - state.last_threshold_crossing >= *interval;
                server_match(matched, kind)
            }
            Self::WatchedEntered => player_matches(kind, curr, prev, watch),
            Self::WatchedLeft => player_matches(kind, prev, curr, watch),
        }
    }

    /// State change applied to the current snapshot once the rule matched.
    pub fn post_match(&self, curr: &mut ServerSnapshot) {
        let now = curr.captured_at();
        match self {
            Self::OverThreshold { .. } | Self::UnderThreshold { .. } => {
                curr.rule_state_mut().last_threshold_crossing = now;
            }
            Self::Sustained { .. } => {
                curr.rule_state_mut().last_sustained_notice = now;
            }
            Self::WatchedEntered | Self::WatchedLeft => {}
        }
    }
}

fn server_match(matched: bool, kind: NotificationKind) -> Vec<RuleMatch> {
    if matched {
        vec![RuleMatch::Server(kind)]
    } else {
        Vec::new()
    }
}

/// Watched names present in `present` but not in `absent`, one match each.
fn player_matches(
    kind: NotificationKind,
    present: &ServerSnapshot,
    absent: &ServerSnapshot,
    watch: &dyn WatchListSource,
) -> Vec<RuleMatch> {
    let before: BTreeSet<String> = absent.info().human_names().into_iter().collect();
    let after: BTreeSet<String> = present.info().human_names().into_iter().collect();

    after
        .difference(&before)
        .filter_map(|name| {
            let destinations = watch.destinations_watching(name);
            if destinations.is_empty() {
                None
            } else {
                Some(RuleMatch::Player {
                    kind,
                    name: name.clone(),
                    destinations,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{GameMode, Player, ServerInfo};
    use crate::snapshot::RuleState;
    use crate::watchlist::WatchList;
    use chrono::{DateTime, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + TimeDelta::minutes(minutes)
    }

    fn info(names: &[&str]) -> ServerInfo {
        ServerInfo {
            address: "10.0.0.1:27960".parse().unwrap(),
            name: "Deathmatch".to_string(),
            map: "aggressor".to_string(),
            game_mode: GameMode::Ffa,
            max_clients: 16,
            players: names
                .iter()
                .map(|n| Player {
                    name: n.to_string(),
                    score: 0,
                    ping: 50,
                })
                .collect(),
        }
    }

    fn crowd(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("p{}", i)).collect()
    }

    fn snap(population: usize, minute: i64, state: RuleState) -> ServerSnapshot {
        let names = crowd(population);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        ServerSnapshot::new(info(&refs), at(minute), state, Variant::Standard)
    }

    fn kinds(matches: &[RuleMatch]) -> Vec<NotificationKind> {
        matches.iter().map(RuleMatch::kind).collect()
    }

    #[test]
    fn test_over_threshold_edge() {
        let watch = WatchList::new();
        let rule = RelevanceRule::OverThreshold { threshold: 4 };
        for (p_prev, p_curr) in [(0, 4), (2, 5), (3, 10)] {
            let prev = snap(p_prev, 0, RuleState::fresh(at(0)));
            let curr = snap(p_curr, 1, RuleState::fresh(at(0)));
            assert_eq!(rule.evaluate(&prev, &curr, &watch).len(), 1);

            let under = RelevanceRule::UnderThreshold { threshold: 4 };
            assert!(under.evaluate(&prev, &curr, &watch).is_empty());
        }
    }

    #[test]
    fn test_under_threshold_edge() {
        let watch = WatchList::new();
        let under = RelevanceRule::UnderThreshold { threshold: 4 };
        let over = RelevanceRule::OverThreshold { threshold: 4 };
        for (p_prev, p_curr) in [(4, 3), (5, 0), (10, 2)] {
            let prev = snap(p_prev, 0, RuleState::fresh(at(0)));
            let curr = snap(p_curr, 1, RuleState::fresh(at(0)));
            assert_eq!(under.evaluate(&prev, &curr, &watch).len(), 1);
            assert!(over.evaluate(&prev, &curr, &watch).is_empty());
        }
    }

    #[test]
    fn test_exactly_at_threshold_is_not_under() {
        let watch = WatchList::new();
        let under = RelevanceRule::UnderThreshold { threshold: 4 };
        let prev = snap(5, 0, RuleState::fresh(at(0)));
        let curr = snap(4, 1, RuleState::fresh(at(0)));
        assert!(under.evaluate(&prev, &curr, &watch).is_empty());
    }

    #[test]
    fn test_hovering_does_not_refire() {
        let watch = WatchList::new();
        let over = RelevanceRule::OverThreshold { threshold: 4 };
        let prev = snap(6, 0, RuleState::fresh(at(0)));
        let curr = snap(5, 1, RuleState::fresh(at(0)));
        assert!(over.evaluate(&prev, &curr, &watch).is_empty());
    }

    #[test]
    fn test_sustained_double_guard() {
        let watch = WatchList::new();
        let rule = RelevanceRule::Sustained {
            threshold: 4,
            interval: TimeDelta::minutes(30),
        };
        let prev = snap(5, 39, RuleState::fresh(at(0)));

        // 40 minutes after the last crossing, never noticed before
        let curr = snap(5, 40, RuleState::fresh(at(0)));
        assert_eq!(kinds(&rule.evaluate(&prev, &curr, &watch)), vec![NotificationKind::Sustained]);

        // Recent crossing blocks it
        let state = RuleState {
            last_threshold_crossing: at(20),
            last_sustained_notice: at(0),
        };
        let curr = snap(5, 40, state);
        assert!(rule.evaluate(&prev, &curr, &watch).is_empty());

        // Recent notice blocks it
        let state = RuleState {
            last_threshold_crossing: at(0),
            last_sustained_notice: at(15),
        };
        let curr = snap(5, 40, state);
        assert!(rule.evaluate(&prev, &curr, &watch).is_empty());

        // Below threshold never sustains
        let curr = snap(3, 40, RuleState::fresh(at(0)));
        assert!(rule.evaluate(&prev, &curr, &watch).is_empty());
    }

    #[test]
    fn test_post_match_touches_distinct_fields() {
        let mut curr = snap(5, 40, RuleState::fresh(at(0)));

        RelevanceRule::Sustained {
            threshold: 4,
            interval: TimeDelta::minutes(30),
        }
        .post_match(&mut curr);
        assert_eq!(curr.rule_state().last_sustained_notice, at(40));
        assert_eq!(curr.rule_state().last_threshold_crossing, at(0));

        RelevanceRule::UnderThreshold { threshold: 4 }.post_match(&mut curr);
        assert_eq!(curr.rule_state().last_threshold_crossing, at(40));

        let before = curr.rule_state().clone();
        RelevanceRule::WatchedEntered.post_match(&mut curr);
        assert_eq!(curr.rule_state(), &before);
    }

    #[test]
    fn test_watched_rules() {
        let mut watch = WatchList::new();
        watch.add("room-1".into(), "Anna");
        watch.add("room-2".into(), "Bob");

        let prev = ServerSnapshot::new(
            info(&["Anna", "Carl"]),
            at(0),
            RuleState::fresh(at(0)),
            Variant::Standard,
        );
        let curr = ServerSnapshot::new(
            info(&["^1Bob", "Carl"]),
            at(1),
            RuleState::fresh(at(0)),
            Variant::Standard,
        );

        let left = RelevanceRule::WatchedLeft.evaluate(&prev, &curr, &watch);
        assert_eq!(
            left,
            vec![RuleMatch::Player {
                kind: NotificationKind::WatchedLeft,
                name: "Anna".to_string(),
                destinations: BTreeSet::from([DestinationId::from("room-1")]),
            }]
        );

        let entered = RelevanceRule::WatchedEntered.evaluate(&prev, &curr, &watch);
        assert_eq!(
            entered,
            vec![RuleMatch::Player {
                kind: NotificationKind::WatchedEntered,
                name: "Bob".to_string(),
                destinations: BTreeSet::from([DestinationId::from("room-2")]),
            }]
        );
    }

    #[test]
    fn test_still_present_or_unwatched_never_match() {
        let mut watch = WatchList::new();
        watch.add("room-1".into(), "Anna");

        let prev = ServerSnapshot::new(
            info(&["Anna"]),
            at(0),
            RuleState::fresh(at(0)),
            Variant::Standard,
        );
        let curr = ServerSnapshot::new(
            info(&["Anna", "Zed"]),
            at(1),
            RuleState::fresh(at(0)),
            Variant::Standard,
        );

        assert!(RelevanceRule::WatchedLeft.evaluate(&prev, &curr, &watch).is_empty());
        assert!(RelevanceRule::WatchedEntered.evaluate(&prev, &curr, &watch).is_empty());
    }

    #[test]
    fn test_variant_rule_order_and_thresholds() {
        let settings = RuleSettings::default();
        let rules = Variant::HighCapacity.rules(&settings);
        let order: Vec<NotificationKind> = rules.iter().map(RelevanceRule::kind).collect();
        assert_eq!(
            order,
            vec![
                NotificationKind::UnderThreshold,
                NotificationKind::OverThreshold,
                NotificationKind::Sustained,
                NotificationKind::WatchedLeft,
                NotificationKind::WatchedEntered,
            ]
        );
        assert_eq!(rules[0], RelevanceRule::UnderThreshold { threshold: 8 });
        assert_eq!(Variant::HeadToHead.threshold(&settings), 1);
        assert_eq!(Variant::Standard.threshold(&settings), 4);
    }
}
