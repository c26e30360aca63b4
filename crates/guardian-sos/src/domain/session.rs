//! The SOS alert session and its lifecycle state machine.
//!
//! ```text
//! Idle → Countdown → Triggered → Sending → Succeeded | PartialFailure → Idle
//!            └──→ Cancelled → Idle
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AnomalyKind, DispatchSummary};
use crate::GuardianError;

/// Unique identifier for an alert session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the SOS flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosState {
    /// No active session
    Idle,
    /// Waiting for the countdown deadline; cancellable
    Countdown,
    /// Countdown elapsed
    Triggered,
    /// Dispatch in flight; not cancellable
    Sending,
    /// At least one contact was reached
    Succeeded,
    /// Nobody was reached, or dispatch could not run
    PartialFailure,
    /// User cancelled during the countdown
    Cancelled,
}

impl SosState {
    /// Whether `self → next` is a legal forward transition
    pub fn can_transition_to(&self, next: SosState) -> bool {
        use SosState::*;
        matches!(
            (self, next),
            (Idle, Countdown)
                | (Countdown, Triggered)
                | (Countdown, Cancelled)
                | (Triggered, Sending)
                | (Sending, Succeeded)
                | (Sending, PartialFailure)
                | (Succeeded, Idle)
                | (PartialFailure, Idle)
                | (Cancelled, Idle)
        )
    }

    /// States after which the session may only return to Idle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SosState::Succeeded | SosState::PartialFailure | SosState::Cancelled
        )
    }

    /// Whether a session is attached in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, SosState::Idle)
    }
}

impl std::fmt::Display for SosState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SosState::Idle => "idle",
            SosState::Countdown => "countdown",
            SosState::Triggered => "triggered",
            SosState::Sending => "sending",
            SosState::Succeeded => "succeeded",
            SosState::PartialFailure => "partial_failure",
            SosState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// What started the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "kind")]
pub enum TriggerSource {
    /// User pressed the SOS button
    Manual,
    /// A motion anomaly started the countdown
    Anomaly(AnomalyKind),
}

impl TriggerSource {
    /// Description used in persisted records
    pub fn describe(&self) -> String {
        match self {
            TriggerSource::Manual => "SOS triggered manually".to_string(),
            TriggerSource::Anomaly(kind) => format!("Automatic SOS: {}", kind.describe()),
        }
    }
}

/// Why a session ended in `PartialFailure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No contacts configured; no network work was done
    NoContacts,
    /// Every channel failed for every contact
    AllChannelsFailed,
    /// The contact repository or another backend was unreachable
    Infrastructure,
}

/// One instance of the SOS lifecycle from trigger to reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSession {
    id: SessionId,
    owner_id: String,
    created_at: DateTime<Utc>,
    state: SosState,
    countdown_deadline: DateTime<Utc>,
    trigger: TriggerSource,
    cancel_reason: Option<String>,
    failure: Option<FailureKind>,
    summary: DispatchSummary,
}

impl AlertSession {
    /// Create a session already in `Countdown`.
    ///
    /// A deadline past the representable range saturates at the latest
    /// instant `DateTime<Utc>` can hold.
    pub fn start(
        owner_id: impl Into<String>,
        countdown: chrono::Duration,
        trigger: TriggerSource,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: SessionId::new(),
            owner_id: owner_id.into(),
            created_at,
            state: SosState::Countdown,
            countdown_deadline: created_at
                .checked_add_signed(countdown)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            trigger,
            cancel_reason: None,
            failure: None,
            summary: DispatchSummary::new(),
        }
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Owning user
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Creation time
    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Current state
    pub fn state(&self) -> SosState {
        self.state
    }

    /// Wall-clock countdown deadline
    pub fn countdown_deadline(&self) -> &DateTime<Utc> {
        &self.countdown_deadline
    }

    /// What started the session
    pub fn trigger(&self) -> TriggerSource {
        self.trigger
    }

    /// Cancellation reason, if cancelled
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    /// Failure cause, if the session ended in `PartialFailure`
    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    /// Delivery summary
    pub fn summary(&self) -> &DispatchSummary {
        &self.summary
    }

    /// Mutable delivery summary; appends fail once sealed
    pub fn summary_mut(&mut self) -> &mut DispatchSummary {
        &mut self.summary
    }

    /// Move forward to `next`, rejecting anything else
    pub fn advance(&mut self, next: SosState) -> Result<(), GuardianError> {
        if !self.state.can_transition_to(next) {
            return Err(GuardianError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.summary.seal();
        }
        Ok(())
    }

    /// Cancel during countdown
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), GuardianError> {
        self.advance(SosState::Cancelled)?;
        self.cancel_reason = Some(reason.into());
        Ok(())
    }

    /// End in `PartialFailure` with a cause
    pub fn fail(&mut self, kind: FailureKind) -> Result<(), GuardianError> {
        self.advance(SosState::PartialFailure)?;
        self.failure = Some(kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelKind, ContactId, DispatchOutcome};

    fn session() -> AlertSession {
        AlertSession::start("user-1", chrono::Duration::seconds(5), TriggerSource::Manual)
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut s = session();
        assert_eq!(s.state(), SosState::Countdown);
        s.advance(SosState::Triggered).unwrap();
        s.advance(SosState::Sending).unwrap();
        s.advance(SosState::Succeeded).unwrap();
        assert!(s.state().is_terminal());
        assert!(s.summary().is_sealed());
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut s = session();
        s.advance(SosState::Triggered).unwrap();
        let err = s.advance(SosState::Countdown).unwrap_err();
        assert!(matches!(
            err,
            GuardianError::InvalidTransition {
                from: SosState::Triggered,
                to: SosState::Countdown
            }
        ));
    }

    #[test]
    fn test_cancel_only_from_countdown() {
        let mut s = session();
        s.cancel("changed my mind").unwrap();
        assert_eq!(s.cancel_reason(), Some("changed my mind"));

        let mut sending = session();
        sending.advance(SosState::Triggered).unwrap();
        sending.advance(SosState::Sending).unwrap();
        assert!(sending.cancel("too late").is_err());
        assert_eq!(sending.state(), SosState::Sending);
    }

    #[test]
    fn test_summary_sealed_after_failure() {
        let mut s = session();
        s.advance(SosState::Triggered).unwrap();
        s.advance(SosState::Sending).unwrap();
        s.fail(FailureKind::AllChannelsFailed).unwrap();
        assert_eq!(s.failure(), Some(FailureKind::AllChannelsFailed));
        assert!(s
            .summary_mut()
            .record(DispatchOutcome::delivered(ChannelKind::Sms, ContactId::new("x")))
            .is_err());
    }

    #[test]
    fn test_deadline_after_creation() {
        let s = session();
        assert_eq!(*s.countdown_deadline() - *s.created_at(), chrono::Duration::seconds(5));
    }

    #[test]
    fn test_unrepresentable_deadline_saturates() {
        let s = AlertSession::start(
            "owner",
            chrono::Duration::MAX,
            TriggerSource::Manual,
        );
        assert_eq!(*s.countdown_deadline(), DateTime::<Utc>::MAX_UTC);
        assert_eq!(s.state(), SosState::Countdown);
    }
}
