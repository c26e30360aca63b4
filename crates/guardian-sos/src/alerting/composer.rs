//! Composition of the single message sent to every contact.

use chrono::Utc;

use crate::domain::{AlertPayload, AlertSession, TriggerSource};

/// Builds the alert payload for a session
#[derive(Debug, Clone)]
pub struct MessageComposer {
    title: String,
}

impl MessageComposer {
    /// Create a composer using `title` for push/email subjects
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Compose the payload for `session`.
    ///
    /// `location` is the map link, or the unavailable placeholder.
    pub fn compose(&self, session: &AlertSession, sender_name: &str, location: &str) -> AlertPayload {
        let timestamp = Utc::now();
        let reason = match session.trigger() {
            TriggerSource::Manual => String::new(),
            TriggerSource::Anomaly(kind) => format!(" Reason: {}.", kind.describe()),
        };

        let body = format!(
            "EMERGENCY! {} needs help.{} Time: {}. Location: {}",
            sender_name,
            reason,
            timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            location
        );

        AlertPayload {
            session_id: session.id(),
            title: format!("{}: {}", self.title, sender_name),
            body,
            sender_name: sender_name.to_string(),
            location: location.to_string(),
            timestamp,
            metadata: Default::default(),
        }
        .with_metadata("trigger", session.trigger().describe())
    }
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::new("Emergency SOS")
    }
}
