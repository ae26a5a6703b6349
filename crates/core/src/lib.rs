pub mod collaborator;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notification;
pub mod rules;
pub mod sequencer;
pub mod server;
pub mod snapshot;
pub mod watchlist;

// Re-export commonly used types
pub use collaborator::{Delivery, ServerQuery, WatchListSource};
pub use config::{Config, ConfigLoader, ConfigValidator, HostConfig, Platform};
pub use error::{DomainError, InfraError, RatStalkerError};
pub use monitor::{MonitorHandle, MonitorLoop, MonitorReport, MonitorSettings, SnapshotStore};
pub use notification::{Dispatch, Notification, NotificationKind, ServerSummary};
pub use rules::{RelevanceRule, RuleMatch, RuleSettings};
pub use sequencer::NotificationSequencer;
pub use server::{strip_colors, DestinationId, GameMode, Player, ServerIdentity, ServerInfo};
pub use snapshot::{CaptureParams, DiffContext, GlobalSnapshot, RuleState, ServerSnapshot, Variant};
pub use watchlist::WatchList;
