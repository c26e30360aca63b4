//! Bridge from motion anomalies to automatic SOS countdowns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AlertDispatcher, StartOutcome};
use crate::detection::AnomalyConsumer;
use crate::domain::{AnomalyEvent, AnomalyKind, TriggerSource};
use crate::error::ConfigError;

/// Which anomalies may start a countdown on their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerPolicy {
    /// Kinds that start a countdown
    pub kinds: Vec<AnomalyKind>,
    /// Events below this confidence are ignored
    pub min_confidence: f64,
    /// Countdown length for automatic triggers (seconds)
    pub countdown_secs: u64,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            kinds: vec![AnomalyKind::SuddenHalt, AnomalyKind::ProlongedStationary],
            min_confidence: 0.7,
            countdown_secs: 10,
        }
    }
}

impl TriggerPolicy {
    /// Policy that never triggers
    pub fn disabled() -> Self {
        Self {
            kinds: Vec::new(),
            ..Self::default()
        }
    }

    /// Whether `kind` at `confidence` should start a countdown
    pub fn admits(&self, kind: AnomalyKind, confidence: f64) -> bool {
        self.kinds.contains(&kind) && confidence >= self.min_confidence
    }

    /// Countdown length
    pub fn countdown(&self) -> Duration {
        Duration::from_secs(self.countdown_secs)
    }

    /// Validate
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::invalid_value(
                "trigger.min_confidence",
                format!("{} is outside [0, 1]", self.min_confidence),
            ));
        }
        if !self.kinds.is_empty() && self.countdown_secs == 0 {
            return Err(ConfigError::invalid_value(
                "trigger.countdown_secs",
                "automatic triggers need a cancellable countdown",
            ));
        }
        Ok(())
    }
}

/// Anomaly consumer that starts SOS countdowns
pub struct AutoTrigger {
    dispatcher: AlertDispatcher,
    policy: TriggerPolicy,
}

impl AutoTrigger {
    /// Create a trigger bound to `dispatcher`
    pub fn new(dispatcher: AlertDispatcher, policy: TriggerPolicy) -> Self {
        Self { dispatcher, policy }
    }

    /// Get the policy
    pub fn policy(&self) -> &TriggerPolicy {
        &self.policy
    }

    fn consider(&self, kind: AnomalyKind, confidence: f64) {
        if !self.policy.admits(kind, confidence) {
            tracing::debug!(kind = %kind, confidence, "Anomaly below trigger policy");
            return;
        }

        let outcome = self
            .dispatcher
            .start_countdown_for(self.policy.countdown(), TriggerSource::Anomaly(kind));
        match outcome {
            StartOutcome::Started(id) => {
                tracing::warn!(session_id = %id, kind = %kind, confidence, "Automatic SOS countdown started")
            }
            StartOutcome::AlreadyCounting(_) | StartOutcome::Busy(_) => {
                tracing::debug!(kind = %kind, ?outcome, "Automatic trigger suppressed")
            }
            StartOutcome::InvalidDuration => {
                tracing::error!(kind = %kind, "Trigger policy countdown out of range")
            }
        }
    }
}

impl AnomalyConsumer for AutoTrigger {
    fn on_sprint(&self, event: &AnomalyEvent) {
        self.consider(event.kind, event.confidence);
    }

    fn on_sudden_halt(&self, event: &AnomalyEvent) {
        self.consider(event.kind, event.confidence);
    }

    fn on_prolonged_stationary(&self, event: &AnomalyEvent) {
        self.consider(event.kind, event.confidence);
    }

    fn on_abnormal_movement(&self, kind: AnomalyKind, confidence: f64) {
        self.consider(kind, confidence);
    }
}
