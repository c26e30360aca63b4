//! Records written to durable storage after a dispatch.
//!
//! Field names and status literals are a wire contract shared with the
//! responder dashboard; the public record's `status` is always lowercase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AlertSession, AnomalyKind, Contact, DispatchSummary, SosState, TriggerSource};

/// Identifier of a stored public alert record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random record ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a public alert as seen by responders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Alert is live
    Active,
    /// A responder closed the alert
    Resolved,
    /// The user withdrew the alert
    Cancelled,
}

impl AlertStatus {
    /// Wire literal
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Cancelled => "cancelled",
        }
    }

    /// Only an active alert may be closed
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Resolved) | (AlertStatus::Active, AlertStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency shown to responders
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Informational
    Low,
    /// Needs attention
    Medium,
    /// Urgent
    High,
    /// Immediate action required
    Critical,
}

impl RiskLevel {
    /// Derive from what started the session
    pub fn from_trigger(trigger: &TriggerSource) -> Self {
        match trigger {
            TriggerSource::Manual => RiskLevel::High,
            TriggerSource::Anomaly(kind) => match kind {
                AnomalyKind::SuddenHalt | AnomalyKind::ProlongedStationary => RiskLevel::Critical,
                AnomalyKind::Sprint | AnomalyKind::RunningPattern => RiskLevel::High,
                AnomalyKind::UnusualRotation => RiskLevel::Medium,
            },
        }
    }
}

/// Outcome stored in the user's private history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// At least one contact was reached
    Sent,
    /// Nobody was reached
    Failed,
}

impl From<SosState> for DispatchStatus {
    fn from(state: SosState) -> Self {
        match state {
            SosState::Succeeded => DispatchStatus::Sent,
            _ => DispatchStatus::Failed,
        }
    }
}

/// Public alert record visible to responders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Display name of the person in distress
    pub user_name: String,
    /// What happened
    pub description: String,
    /// Urgency
    pub risk_level: RiskLevel,
    /// Lifecycle status
    pub status: AlertStatus,
    /// Creation time, epoch milliseconds
    pub timestamp_ms: i64,
    /// User ID of the sender
    pub sender_id: String,
    /// Map link or placeholder
    pub location_string: String,
}

impl AlertRecord {
    /// Build the public record for a freshly dispatched session
    pub fn for_session(session: &AlertSession, user_name: &str, location: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            description: session.trigger().describe(),
            risk_level: RiskLevel::from_trigger(&session.trigger()),
            status: AlertStatus::Active,
            timestamp_ms: session.created_at().timestamp_millis(),
            sender_id: session.owner_id().to_string(),
            location_string: location.to_string(),
        }
    }
}

/// Contact fields frozen into a history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSnapshot {
    /// Contact name
    pub name: String,
    /// Contact phone
    pub phone: String,
}

impl From<&Contact> for ContactSnapshot {
    fn from(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            phone: contact.phone.clone(),
        }
    }
}

/// Private history entry for the initiating user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Delivery status
    pub status: DispatchStatus,
    /// Display name of the user
    pub user_name: String,
    /// Map link or placeholder
    pub location: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Contacts at the time of dispatch
    pub contacts: Vec<ContactSnapshot>,
    /// Per-channel delivery summary
    pub summary: DispatchSummary,
}

impl HistoryRecord {
    /// Build the history entry for a session in its final dispatch state
    pub fn for_session(
        session: &AlertSession,
        final_state: SosState,
        user_name: &str,
        location: &str,
        contacts: &[Contact],
    ) -> Self {
        Self {
            status: DispatchStatus::from(final_state),
            user_name: user_name.to_string(),
            location: location.to_string(),
            created_at: *session.created_at(),
            contacts: contacts.iter().map(ContactSnapshot::from).collect(),
            summary: session.summary().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_record_wire_shape() {
        let session = AlertSession::start("uid-7", chrono::Duration::seconds(3), TriggerSource::Manual);
        let record = AlertRecord::for_session(&session, "Dana", "Location unavailable");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["status"], "active");
        assert_eq!(json["riskLevel"], "high");
        assert_eq!(json["senderId"], "uid-7");
        assert_eq!(json["userName"], "Dana");
        assert_eq!(json["locationString"], "Location unavailable");
        assert!(json["timestampMs"].is_i64());
    }

    #[test]
    fn test_status_literals_lowercase() {
        for (status, literal) in [
            (AlertStatus::Active, "\"active\""),
            (AlertStatus::Resolved, "\"resolved\""),
            (AlertStatus::Cancelled, "\"cancelled\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), literal);
        }
    }

    #[test]
    fn test_status_closes_only_from_active() {
        assert!(AlertStatus::Active.can_transition_to(AlertStatus::Resolved));
        assert!(!AlertStatus::Resolved.can_transition_to(AlertStatus::Active));
        assert!(!AlertStatus::Cancelled.can_transition_to(AlertStatus::Resolved));
    }

    #[test]
    fn test_risk_from_anomaly() {
        assert_eq!(
            RiskLevel::from_trigger(&TriggerSource::Anomaly(AnomalyKind::SuddenHalt)),
            RiskLevel::Critical
        );
        assert_eq!(
            RiskLevel::from_trigger(&TriggerSource::Anomaly(AnomalyKind::UnusualRotation)),
            RiskLevel::Medium
        );
    }
}
