//! Per-contact delivery outcomes and their aggregate summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ContactId;
use crate::GuardianError;

/// Notification transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Carrier SMS
    Sms,
    /// Mobile push notification
    Push,
    /// Batched email
    Email,
}

impl ChannelKind {
    /// All channel kinds
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Sms, ChannelKind::Push, ChannelKind::Email];
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Sms => write!(f, "sms"),
            ChannelKind::Push => write!(f, "push"),
            ChannelKind::Email => write!(f, "email"),
        }
    }
}

/// Result of delivering one alert to one contact over one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Channel used
    pub channel: ChannelKind,
    /// Recipient
    pub contact_id: ContactId,
    /// Whether delivery was accepted by the transport
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// A successful delivery
    pub fn delivered(channel: ChannelKind, contact_id: ContactId) -> Self {
        Self {
            channel,
            contact_id,
            success: true,
            error: None,
        }
    }

    /// A failed delivery
    pub fn failed(channel: ChannelKind, contact_id: ContactId, error: impl Into<String>) -> Self {
        Self {
            channel,
            contact_id,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Aggregate of all outcomes recorded for one alert session.
///
/// Outcomes may only be appended until the summary is sealed, which happens
/// when the owning session reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    sent: BTreeMap<ChannelKind, u32>,
    failed: BTreeMap<ChannelKind, u32>,
    outcomes: Vec<DispatchOutcome>,
    sealed: bool,
}

impl DispatchSummary {
    /// Create an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome
    pub fn record(&mut self, outcome: DispatchOutcome) -> Result<(), GuardianError> {
        if self.sealed {
            return Err(GuardianError::SummarySealed);
        }
        let counter = if outcome.success {
            &mut self.sent
        } else {
            &mut self.failed
        };
        *counter.entry(outcome.channel).or_insert(0) += 1;
        self.outcomes.push(outcome);
        Ok(())
    }

    /// Append a batch of outcomes
    pub fn extend(
        &mut self,
        outcomes: impl IntoIterator<Item = DispatchOutcome>,
    ) -> Result<(), GuardianError> {
        for outcome in outcomes {
            self.record(outcome)?;
        }
        Ok(())
    }

    /// Freeze the summary
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the summary has been frozen
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Successful deliveries on a channel
    pub fn sent_count(&self, channel: ChannelKind) -> u32 {
        self.sent.get(&channel).copied().unwrap_or(0)
    }

    /// Failed deliveries on a channel
    pub fn failed_count(&self, channel: ChannelKind) -> u32 {
        self.failed.get(&channel).copied().unwrap_or(0)
    }

    /// Successful deliveries across all channels
    pub fn total_sent(&self) -> u32 {
        self.sent.values().sum()
    }

    /// Failed deliveries across all channels
    pub fn total_failed(&self) -> u32 {
        self.failed.values().sum()
    }

    /// True if at least one channel reached at least one contact
    pub fn any_success(&self) -> bool {
        self.total_sent() > 0
    }

    /// All recorded outcomes in arrival order
    pub fn outcomes(&self) -> &[DispatchOutcome] {
        &self.outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_channel() {
        let mut summary = DispatchSummary::new();
        summary
            .extend([
                DispatchOutcome::delivered(ChannelKind::Sms, ContactId::new("a")),
                DispatchOutcome::delivered(ChannelKind::Sms, ContactId::new("b")),
                DispatchOutcome::failed(ChannelKind::Push, ContactId::new("c"), "gateway down"),
            ])
            .unwrap();

        assert_eq!(summary.sent_count(ChannelKind::Sms), 2);
        assert_eq!(summary.failed_count(ChannelKind::Push), 1);
        assert_eq!(summary.sent_count(ChannelKind::Email), 0);
        assert_eq!(summary.total_sent(), 2);
        assert!(summary.any_success());
    }

    #[test]
    fn test_sealed_summary_rejects_appends() {
        let mut summary = DispatchSummary::new();
        summary.seal();
        let result = summary.record(DispatchOutcome::delivered(ChannelKind::Email, ContactId::new("a")));
        assert!(matches!(result, Err(GuardianError::SummarySealed)));
        assert!(summary.outcomes().is_empty());
    }

    #[test]
    fn test_all_failures_is_not_success() {
        let mut summary = DispatchSummary::new();
        summary
            .record(DispatchOutcome::failed(ChannelKind::Sms, ContactId::new("a"), "no permission"))
            .unwrap();
        assert!(!summary.any_success());
        assert_eq!(summary.total_failed(), 1);
    }
}
