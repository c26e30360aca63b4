//! Error types for the guardian SOS core.
//!
//! ```text
//! GuardianError (top-level)
//! ├── ConfigError   (config validation / file loading)
//! ├── ChannelError  (one notification transport, one contact)
//! └── StoreError    (durable alert storage)
//! ```
//!
//! Channel and store errors are normally absorbed by the dispatcher: a channel
//! error becomes a failed `DispatchOutcome`, a store error is logged.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{SessionId, SosState};

/// Unified error type for SOS operations
#[derive(Debug, Error)]
pub enum GuardianError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Contact repository or another backend failed
    #[error("Repository error: {0}")]
    Repository(String),

    /// Durable store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Notification channel error
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session state machine violation
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: SosState,
        /// Requested state
        to: SosState,
    },

    /// No session with the given ID is attached to the dispatcher
    #[error("No active alert session {0}")]
    NoActiveSession(SessionId),

    /// Outcome appended after the session reached a terminal state
    #[error("Dispatch summary is sealed")]
    SummarySealed,

    /// Motion monitoring already running
    #[error("Motion monitor is already running")]
    MonitorRunning,

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a notification transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The device lacks the permission required by this transport
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The transport call failed
    #[error("transport failure: {0}")]
    Transport(String),

    /// The transport did not answer in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The contact has no address for this transport
    #[error("contact has no address for this channel")]
    MissingAddress,
}

impl ChannelError {
    /// Construct a [`ChannelError::Transport`] from any displayable error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        ChannelError::Transport(msg.into())
    }
}

/// Errors raised by the durable alert store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the write
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Errors produced when loading or validating a [`crate::config::GuardianConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written
    #[error("Failed to access config file {path:?}: {source}")]
    FileRead {
        /// Path that was accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A field has an invalid value
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Human-readable reason
        reason: String,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`]
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
