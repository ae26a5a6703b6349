//! RatStalker Error Types
//!
//! This module defines a layered error hierarchy:
//! - `DomainError`: configuration problems detected by the engine
//! - `InfraError`: IO, YAML and name resolution failures
//! - `RatStalkerError`: top-level error that wraps both categories
//!
//! None of these are raised per poll cycle. Unreachable servers are data
//! absence and failed deliveries are reported as booleans; only startup can
//! fail.

use std::fmt;

/// Domain-level errors
#[derive(Debug)]
pub enum DomainError {
    /// Configuration file not found at the specified path
    ConfigNotFound { path: String },
    /// Configuration validation failed
    ConfigInvalid { field: String, reason: String },
    /// Configuration parsing failed
    ConfigParse { source: String },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigNotFound { path } => write!(f, "Config not found: {}", path),
            Self::ConfigInvalid { field, reason } => {
                write!(f, "Config invalid [{}]: {}", field, reason)
            }
            Self::ConfigParse { source } => write!(f, "Config parse error: {}", source),
        }
    }
}

impl std::error::Error for DomainError {}

/// Infrastructure-level errors
#[derive(Debug)]
pub enum InfraError {
    /// IO operation failed
    Io(std::io::Error),
    /// YAML serialization/deserialization failed
    Yaml(serde_yml::Error),
    /// A configured host could not be resolved to an address
    Resolve { host: String, reason: String },
}

impl fmt::Display for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Yaml(err) => write!(f, "YAML error: {}", err),
            Self::Resolve { host, reason } => write!(f, "Cannot resolve [{}]: {}", host, reason),
        }
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Yaml(e) => Some(e),
            Self::Resolve { .. } => None,
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yml::Error> for InfraError {
    fn from(err: serde_yml::Error) -> Self {
        Self::Yaml(err)
    }
}

/// Top-level error type for RatStalker
#[derive(Debug)]
pub enum RatStalkerError {
    /// Business logic error
    Domain(DomainError),
    /// Infrastructure/external system error
    Infra(InfraError),
}

impl fmt::Display for RatStalkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{}", e),
            Self::Infra(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RatStalkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Infra(e) => Some(e),
        }
    }
}

impl From<DomainError> for RatStalkerError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<InfraError> for RatStalkerError {
    fn from(err: InfraError) -> Self {
        Self::Infra(err)
    }
}

// Convenience conversions from infrastructure error sources
impl From<std::io::Error> for RatStalkerError {
    fn from(err: std::io::Error) -> Self {
        Self::Infra(InfraError::Io(err))
    }
}

impl From<serde_yml::Error> for RatStalkerError {
    fn from(err: serde_yml::Error) -> Self {
        Self::Infra(InfraError::Yaml(err))
    }
}

impl RatStalkerError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::Domain(DomainError::ConfigNotFound { path: path.into() })
    }

    pub fn config_parse_error(source: impl Into<String>) -> Self {
        Self::Domain(DomainError::ConfigParse {
            source: source.into(),
        })
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Domain(DomainError::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        })
    }

    pub fn resolve_error(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Infra(InfraError::Resolve {
            host: host.into(),
            reason: reason.into(),
        })
    }
}
