//! The single message composed for one dispatch and shared by every channel.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionId;

/// Payload containing alert details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Session this payload belongs to
    pub session_id: SessionId,
    /// Short title (push/email subject)
    pub title: String,
    /// Full message text
    pub body: String,
    /// Display name of the person in distress
    pub sender_name: String,
    /// Map link or the unavailable placeholder
    pub location: String,
    /// When the alert was composed
    pub timestamp: DateTime<Utc>,
    /// Extra key/value data forwarded to push recipients
    pub metadata: BTreeMap<String, String>,
}

impl AlertPayload {
    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
