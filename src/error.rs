//! Error taxonomy.
//!
//! Each concern owns a `thiserror` enum; [`VBindError`] unifies them for the
//! controller. Every error carries a grepable code through [`ErrorCode`].

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use crate::bus::BusError;
use crate::dom::DomError;
use crate::source::FetchError;

/// Stable machine-readable code for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Construction arguments that are missing or unusable. Raised before any
/// fetch starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No container element for template.")]
    MissingContainer,

    /// A selector container matched nothing in its document.
    #[error("No container element matches selector '{selector}'.")]
    ContainerNotFound { selector: String },

    #[error("No data object for template binding.")]
    MissingData,

    /// Data was given but is not a JSON object.
    #[error("Data for template binding must be an object, got {kind}.")]
    DataNotObject { kind: &'static str },

    #[error("A template path must be specified")]
    MissingPath,
}

// =============================================================================
// UNIFIED
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VBindError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The template could not be retrieved. Displays the fetch detail verbatim.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Markup(#[from] DomError),

    #[error(transparent)]
    Bus(#[from] BusError),

    /// Lifecycle call made from the wrong state, e.g. a second `load`.
    #[error("{operation} is not allowed in state {state}")]
    InvalidState { operation: &'static str, state: &'static str },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingContainer => "E_MISSING_CONTAINER",
            Self::ContainerNotFound { .. } => "E_CONTAINER_NOT_FOUND",
            Self::MissingData => "E_MISSING_DATA",
            Self::DataNotObject { .. } => "E_DATA_NOT_OBJECT",
            Self::MissingPath => "E_MISSING_PATH",
        }
    }
}

impl ErrorCode for FetchError {
    fn error_code(&self) -> &'static str {
        if self.status.is_some() { "E_FETCH_STATUS" } else { "E_FETCH_TRANSPORT" }
    }

    fn retryable(&self) -> bool {
        matches!(self.status, None | Some(429 | 500..=599))
    }
}

impl ErrorCode for DomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "E_MARKUP_PARSE",
        }
    }
}

impl ErrorCode for BusError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Cycle { .. } => "E_PUBLISH_CYCLE",
            Self::DepthExceeded { .. } => "E_PUBLISH_DEPTH",
        }
    }
}

impl ErrorCode for VBindError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Fetch(e) => e.error_code(),
            Self::Markup(e) => e.error_code(),
            Self::Bus(e) => e.error_code(),
            Self::InvalidState { .. } => "E_INVALID_STATE",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.retryable(),
            Self::Config(_) | Self::Markup(_) | Self::Bus(_) | Self::InvalidState { .. } => false,
        }
    }
}
