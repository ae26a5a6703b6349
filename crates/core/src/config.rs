//! RatStalker Configuration
//!
//! YAML configuration with serde defaults. Every section may be omitted;
//! only `query.hosts` has no useful default and is checked by
//! [`ConfigValidator`].

use crate::error::RatStalkerError;
use crate::rules::{
    secs_to_delta, RuleSettings, DEFAULT_HEAD_TO_HEAD_THRESHOLD, DEFAULT_HIGH_CAPACITY_MARKER,
    DEFAULT_HIGH_CAPACITY_THRESHOLD, DEFAULT_STANDARD_THRESHOLD, DEFAULT_SUSTAINED_INTERVAL_SECS,
};
use crate::server::DestinationId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default poll interval (seconds)
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
/// Default per-attempt query timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;
/// Default number of extra query attempts per host
pub const DEFAULT_RETRIES: u32 = 2;
/// Default game server port, used when an address has none
pub const DEFAULT_SERVER_PORT: u16 = 27960;
/// Environment variable consulted for the Matrix access token
pub const MATRIX_TOKEN_ENV: &str = "RATSTALKER_MATRIX_TOKEN";

// ============================================================================
// Helper functions for paths
// ============================================================================

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_ratstalker_dir() -> PathBuf {
    home_dir().join(".ratstalker")
}

// ============================================================================
// Main Config
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Poll loop configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Population thresholds per server variant
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    /// Game servers and query parameters
    #[serde(default)]
    pub query: QueryConfig,
    /// Where notifications go
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Watched player names, keyed by destination room
    #[serde(default)]
    pub watch: BTreeMap<String, Vec<String>>,
}

// ============================================================================
// Monitor Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Start polling immediately
    #[serde(default = "MonitorConfig::default_enabled")]
    pub enabled: bool,
    /// Seconds between the end of one cycle and the start of the next
    #[serde(default = "MonitorConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// Minimum seconds between two sustained notices for one server
    #[serde(default = "MonitorConfig::default_sustained_interval_secs")]
    pub sustained_interval_secs: u64,
}

impl MonitorConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_interval_secs() -> u64 {
        DEFAULT_INTERVAL_SECS
    }
    fn default_sustained_interval_secs() -> u64 {
        DEFAULT_SUSTAINED_INTERVAL_SECS
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
            sustained_interval_secs: DEFAULT_SUSTAINED_INTERVAL_SECS,
        }
    }
}

// ============================================================================
// Thresholds Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "ThresholdsConfig::default_standard")]
    pub standard: u32,
    #[serde(default = "ThresholdsConfig::default_high_capacity")]
    pub high_capacity: u32,
    #[serde(default = "ThresholdsConfig::default_head_to_head")]
    pub head_to_head: u32,
    /// Servers whose name contains this (case-insensitive) use `high_capacity`
    #[serde(default = "ThresholdsConfig::default_high_capacity_marker")]
    pub high_capacity_marker: String,
}

impl ThresholdsConfig {
    fn default_standard() -> u32 {
        DEFAULT_STANDARD_THRESHOLD
    }
    fn default_high_capacity() -> u32 {
        DEFAULT_HIGH_CAPACITY_THRESHOLD
    }
    fn default_head_to_head() -> u32 {
        DEFAULT_HEAD_TO_HEAD_THRESHOLD
    }
    fn default_high_capacity_marker() -> String {
        DEFAULT_HIGH_CAPACITY_MARKER.to_string()
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            standard: DEFAULT_STANDARD_THRESHOLD,
            high_capacity: DEFAULT_HIGH_CAPACITY_THRESHOLD,
            head_to_head: DEFAULT_HEAD_TO_HEAD_THRESHOLD,
            high_capacity_marker: DEFAULT_HIGH_CAPACITY_MARKER.to_string(),
        }
    }
}

// ============================================================================
// Query Config
// ============================================================================

/// One configured game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Label used in logs
    #[serde(default)]
    pub name: String,
    /// `host:port` or bare `host` (port defaults to 27960)
    pub address: String,
}

impl HostConfig {
    /// Address with the default port filled in when missing.
    pub fn address_with_port(&self) -> String {
        let address = self.address.trim();
        if address.starts_with('[') {
            // Bracketed IPv6, with or without a port
            if address.contains("]:") {
                return address.to_string();
            }
            return format!("{}:{}", address, DEFAULT_SERVER_PORT);
        }
        match address.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => {
                address.to_string()
            }
            _ => format!("{}:{}", address, DEFAULT_SERVER_PORT),
        }
    }

    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    /// Per-attempt timeout in milliseconds
    #[serde(default = "QueryConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra attempts after the first one times out
    #[serde(default = "QueryConfig::default_retries")]
    pub retries: u32,
    /// List servers without human players in one-shot queries
    #[serde(default)]
    pub show_empty: bool,
}

impl QueryConfig {
    fn default_timeout_ms() -> u64 {
        DEFAULT_TIMEOUT_MS
    }
    fn default_retries() -> u32 {
        DEFAULT_RETRIES
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            hosts: vec![],
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            show_empty: false,
        }
    }
}

// ============================================================================
// Delivery Config
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Stdout,
    Matrix,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub platform: Platform,
    /// Rooms that receive server-wide notifications
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub matrix: MatrixConfig,
}

impl DeliveryConfig {
    pub fn broadcast(&self) -> BTreeSet<DestinationId> {
        self.rooms
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(DestinationId::new)
            .collect()
    }
}

/// Matrix client-server API credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// e.g. `https://matrix.example.org`
    #[serde(default)]
    pub homeserver: String,
    /// Falls back to `RATSTALKER_MATRIX_TOKEN` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl MatrixConfig {
    pub fn resolve_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(MATRIX_TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }
}

// ============================================================================
// Config Loading and Validation
// ============================================================================

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file or default locations
    pub fn load(path: Option<&str>) -> Result<Config, RatStalkerError> {
        let config_path = Self::resolve_config_path(path)?;
        tracing::debug!(path = %config_path.display(), "Loading config");
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Config, RatStalkerError> {
        if !path.exists() {
            return Err(RatStalkerError::config_not_found(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| RatStalkerError::config_parse_error(format!("Failed to read: {}", e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config, RatStalkerError> {
        serde_yml::from_str(content)
            .map_err(|e| RatStalkerError::config_parse_error(format!("Failed to parse: {}", e)))
    }

    /// Resolve configuration file path
    fn resolve_config_path(path: Option<&str>) -> Result<PathBuf, RatStalkerError> {
        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let default_paths = [
            default_ratstalker_dir().join("config.yaml"),
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ratstalker.yaml"),
            PathBuf::from("./ratstalker.yaml"),
        ];

        default_paths
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| {
                RatStalkerError::config_not_found(
                    "Run `ratstalker config-sample -o ~/.ratstalker/config.yaml` to create one",
                )
            })
    }
}

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration. Any failure here is fatal at startup.
    pub fn validate(config: &Config) -> Result<(), RatStalkerError> {
        if config.query.hosts.is_empty() {
            return Err(RatStalkerError::config_invalid(
                "query.hosts",
                "At least one game server must be configured",
            ));
        }

        if let Some(host) = config.query.hosts.iter().find(|h| h.address.trim().is_empty()) {
            return Err(RatStalkerError::config_invalid(
                "query.hosts",
                format!("Host '{}' has an empty address", host.name),
            ));
        }

        if config.monitor.interval_secs == 0 {
            return Err(RatStalkerError::config_invalid(
                "monitor.interval_secs",
                "Poll interval must be positive",
            ));
        }

        if config.monitor.sustained_interval_secs == 0 {
            return Err(RatStalkerError::config_invalid(
                "monitor.sustained_interval_secs",
                "Sustained notice interval must be positive",
            ));
        }

        if config.query.timeout_ms == 0 {
            return Err(RatStalkerError::config_invalid(
                "query.timeout_ms",
                "Query timeout must be positive",
            ));
        }

        let thresholds = [
            ("thresholds.standard", config.thresholds.standard),
            ("thresholds.high_capacity", config.thresholds.high_capacity),
            ("thresholds.head_to_head", config.thresholds.head_to_head),
        ];
        if let Some((field, _)) = thresholds.iter().find(|(_, value)| *value == 0) {
            return Err(RatStalkerError::config_invalid(
                *field,
                "Threshold must be at least 1",
            ));
        }

        if config.delivery.platform == Platform::Matrix
            && config.delivery.matrix.homeserver.trim().is_empty()
        {
            return Err(RatStalkerError::config_invalid(
                "delivery.matrix.homeserver",
                "Matrix delivery needs a homeserver URL",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration
    pub fn load(path: &Option<String>) -> Result<Self, RatStalkerError> {
        ConfigLoader::load(path.as_deref())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RatStalkerError> {
        let content = serde_yml::to_string(self).map_err(|e| {
            RatStalkerError::config_parse_error(format!("Serialization failed: {}", e))
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rule parameters derived from the `thresholds` and `monitor` sections.
    pub fn rule_settings(&self) -> RuleSettings {
        RuleSettings {
            standard_threshold: self.thresholds.standard,
            high_capacity_threshold: self.thresholds.high_capacity,
            head_to_head_threshold: self.thresholds.head_to_head,
            sustained_interval: secs_to_delta(self.monitor.sustained_interval_secs),
            high_capacity_marker: self.thresholds.high_capacity_marker.clone(),
        }
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        let mut watch = BTreeMap::new();
        watch.insert(
            "!rats:matrix.example.org".to_string(),
            vec!["Sarge".to_string(), "Major".to_string()],
        );
        Config {
            monitor: MonitorConfig::default(),
            thresholds: ThresholdsConfig::default(),
            query: QueryConfig {
                hosts: vec![
                    HostConfig {
                        name: "rat city".to_string(),
                        address: "arena.example.org:27960".to_string(),
                    },
                    HostConfig {
                        name: "duel".to_string(),
                        address: "arena.example.org:27961".to_string(),
                    },
                ],
                ..QueryConfig::default()
            },
            delivery: DeliveryConfig {
                platform: Platform::Stdout,
                rooms: vec!["!rats:matrix.example.org".to_string()],
                matrix: MatrixConfig {
                    homeserver: "https://matrix.example.org".to_string(),
                    access_token: None,
                },
            },
            watch,
        }
    }
}
