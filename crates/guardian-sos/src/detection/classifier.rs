//! Threshold classifier turning raw motion samples into anomaly events.

use serde::{Deserialize, Serialize};

use crate::domain::{AnomalyEvent, AnomalyKind, MotionSample};
use crate::error::ConfigError;

/// Thresholds and confidences for the motion classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Acceleration magnitude above which a sprint is detected (m/s²)
    pub sprint_magnitude: f64,
    /// Maximum gap to the previous accelerometer sample for a sprint (ms)
    pub sprint_max_gap_ms: u64,
    /// Previous magnitude that counts as "moving fast" for a halt (m/s²)
    pub halt_previous_magnitude: f64,
    /// Current magnitude that counts as "stopped" for a halt (m/s²)
    pub halt_current_magnitude: f64,
    /// Maximum gap between the two halt samples (ms)
    pub halt_max_gap_ms: u64,
    /// Magnitude below which the subject is stationary (m/s²)
    pub stationary_magnitude: f64,
    /// How long stillness must last before it is reported (ms)
    pub stationary_duration_ms: u64,
    /// Rotation magnitude above which rotation is unusual (rad/s)
    pub rotation_magnitude: f64,
    /// Step intervals shorter than this indicate running (ms)
    pub running_step_interval_ms: u64,
    /// Confidence reported for sprints
    pub sprint_confidence: f64,
    /// Confidence reported for sudden halts
    pub halt_confidence: f64,
    /// Confidence reported for prolonged stillness
    pub stationary_confidence: f64,
    /// Confidence reported for unusual rotation
    pub rotation_confidence: f64,
    /// Confidence reported for running cadence
    pub running_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            sprint_magnitude: 15.0,
            sprint_max_gap_ms: 1000,
            halt_previous_magnitude: 8.0,
            halt_current_magnitude: 1.5,
            halt_max_gap_ms: 500,
            stationary_magnitude: 1.2,
            stationary_duration_ms: 30_000,
            rotation_magnitude: 2.0,
            running_step_interval_ms: 300,
            sprint_confidence: 0.85,
            halt_confidence: 0.75,
            stationary_confidence: 0.9,
            rotation_confidence: 0.7,
            running_confidence: 0.8,
        }
    }
}

impl ClassifierConfig {
    /// Check thresholds are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let magnitudes = [
            ("sprint_magnitude", self.sprint_magnitude),
            ("halt_previous_magnitude", self.halt_previous_magnitude),
            ("halt_current_magnitude", self.halt_current_magnitude),
            ("stationary_magnitude", self.stationary_magnitude),
            ("rotation_magnitude", self.rotation_magnitude),
        ];
        for (field, value) in magnitudes {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid_value(field, "must be a positive number"));
            }
        }

        if self.halt_current_magnitude >= self.halt_previous_magnitude {
            return Err(ConfigError::invalid_value(
                "halt_current_magnitude",
                "must be below halt_previous_magnitude",
            ));
        }

        let durations = [
            ("sprint_max_gap_ms", self.sprint_max_gap_ms),
            ("halt_max_gap_ms", self.halt_max_gap_ms),
            ("stationary_duration_ms", self.stationary_duration_ms),
            ("running_step_interval_ms", self.running_step_interval_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "must be > 0"));
            }
        }

        let confidences = [
            ("sprint_confidence", self.sprint_confidence),
            ("halt_confidence", self.halt_confidence),
            ("stationary_confidence", self.stationary_confidence),
            ("rotation_confidence", self.rotation_confidence),
            ("running_confidence", self.running_confidence),
        ];
        for (field, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid_value(field, "must be within [0, 1]"));
            }
        }

        Ok(())
    }
}

/// Rolling state carried between samples.
///
/// The caller owns this value for the lifetime of a sensor stream; a fresh
/// `ClassifierState::default()` starts a new stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierState {
    /// Magnitude of the previous accelerometer sample
    pub last_magnitude: Option<f64>,
    /// Timestamp of the previous accelerometer sample
    pub last_accel_ms: Option<u64>,
    /// Start of the current stationary episode
    pub stationary_since_ms: Option<u64>,
    /// Whether the current stationary episode has been reported
    pub stationary_reported: bool,
    /// Whether the current high-acceleration episode has been reported
    pub sprint_reported: bool,
    /// Timestamp of the previous step event
    pub last_step_ms: Option<u64>,
}

impl ClassifierState {
    /// Whether the subject is currently in a stationary episode
    pub fn is_stationary(&self) -> bool {
        self.stationary_since_ms.is_some()
    }
}

/// Classifier for safety-relevant motion patterns.
///
/// Stateless between calls: every piece of history lives in the
/// [`ClassifierState`] passed in and returned.
#[derive(Debug, Clone)]
pub struct SignalClassifier {
    config: ClassifierConfig,
}

impl SignalClassifier {
    /// Create a new classifier
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Create with default thresholds
    pub fn with_defaults() -> Self {
        Self::new(ClassifierConfig::default())
    }

    /// Get configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one sample.
    ///
    /// Rules are evaluated independently, so one sample can yield several
    /// events. Sprint and prolonged-stationary are edge-triggered: each
    /// fires once per episode and re-arms when the episode ends.
    pub fn classify(
        &self,
        sample: &MotionSample,
        state: ClassifierState,
    ) -> (Vec<AnomalyEvent>, ClassifierState) {
        let mut events = Vec::new();
        let mut next = state;
        let ts = sample.timestamp_ms;

        if let Some(magnitude) = sample.accel_magnitude() {
            self.classify_acceleration(magnitude, ts, &mut next, &mut events);
        }

        if let Some(rotation) = sample.gyro_magnitude() {
            if rotation > self.config.rotation_magnitude {
                events.push(AnomalyEvent::new(
                    AnomalyKind::UnusualRotation,
                    self.config.rotation_confidence,
                    ts,
                ));
            }
        }

        if sample.step {
            if let Some(interval) = next.last_step_ms.and_then(|last| ts.checked_sub(last)) {
                if interval < self.config.running_step_interval_ms {
                    events.push(AnomalyEvent::new(
                        AnomalyKind::RunningPattern,
                        self.config.running_confidence,
                        ts,
                    ));
                }
            }
            next.last_step_ms = Some(ts);
        }

        for event in &events {
            tracing::debug!(
                kind = %event.kind,
                confidence = event.confidence,
                timestamp_ms = event.timestamp_ms,
                "Motion anomaly classified"
            );
        }

        (events, next)
    }

    fn classify_acceleration(
        &self,
        magnitude: f64,
        ts: u64,
        state: &mut ClassifierState,
        events: &mut Vec<AnomalyEvent>,
    ) {
        // Out-of-order samples have no usable gap.
        let gap = state.last_accel_ms.and_then(|last| ts.checked_sub(last));

        if magnitude > self.config.sprint_magnitude {
            let qualifies = gap.map_or(false, |g| g < self.config.sprint_max_gap_ms);
            if qualifies && !state.sprint_reported {
                events.push(AnomalyEvent::new(
                    AnomalyKind::Sprint,
                    self.config.sprint_confidence,
                    ts,
                ));
                state.sprint_reported = true;
            }
        } else {
            state.sprint_reported = false;
        }

        if let (Some(previous), Some(gap)) = (state.last_magnitude, gap) {
            if previous > self.config.halt_previous_magnitude
                && magnitude < self.config.halt_current_magnitude
                && gap < self.config.halt_max_gap_ms
            {
                events.push(AnomalyEvent::new(
                    AnomalyKind::SuddenHalt,
                    self.config.halt_confidence,
                    ts,
                ));
            }
        }

        if magnitude < self.config.stationary_magnitude {
            let since = *state.stationary_since_ms.get_or_insert(ts);
            let still_for = ts.saturating_sub(since);
            if still_for >= self.config.stationary_duration_ms && !state.stationary_reported {
                events.push(AnomalyEvent::new(
                    AnomalyKind::ProlongedStationary,
                    self.config.stationary_confidence,
                    ts,
                ));
                state.stationary_reported = true;
            }
        } else {
            state.stationary_since_ms = None;
            state.stationary_reported = false;
        }

        state.last_magnitude = Some(magnitude);
        state.last_accel_ms = Some(ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(classifier: &SignalClassifier, samples: &[MotionSample]) -> Vec<AnomalyEvent> {
        let mut state = ClassifierState::default();
        let mut all = Vec::new();
        for sample in samples {
            let (events, next) = classifier.classify(sample, state);
            all.extend(events);
            state = next;
        }
        all
    }

    fn kinds(events: &[AnomalyEvent]) -> Vec<AnomalyKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_sprint_requires_previous_sample() {
        let classifier = SignalClassifier::with_defaults();
        let events = run(&classifier, &[MotionSample::accelerometer(0, 20.0, 0.0, 0.0)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_sprint_fires_once_per_episode() {
        let classifier = SignalClassifier::with_defaults();
        let samples = [
            MotionSample::accelerometer(0, 5.0, 0.0, 0.0),
            MotionSample::accelerometer(100, 16.0, 0.0, 0.0),
            MotionSample::accelerometer(200, 18.0, 0.0, 0.0),
            MotionSample::accelerometer(300, 17.0, 0.0, 0.0),
            MotionSample::accelerometer(400, 5.0, 0.0, 0.0),
            MotionSample::accelerometer(500, 16.0, 0.0, 0.0),
        ];
        let events = run(&classifier, &samples);
        let sprints: Vec<_> = events.iter().filter(|e| e.kind == AnomalyKind::Sprint).collect();
        assert_eq!(sprints.len(), 2);
        assert_eq!(sprints[0].timestamp_ms, 100);
        assert_eq!(sprints[1].timestamp_ms, 500);
        assert_relative_eq!(sprints[0].confidence, 0.85);
    }

    #[test]
    fn test_sprint_ignored_after_long_gap() {
        let classifier = SignalClassifier::with_defaults();
        let samples = [
            MotionSample::accelerometer(0, 5.0, 0.0, 0.0),
            MotionSample::accelerometer(1500, 16.0, 0.0, 0.0),
        ];
        assert!(run(&classifier, &samples).is_empty());
    }

    #[test]
    fn test_sudden_halt() {
        let classifier = SignalClassifier::with_defaults();
        let samples = [
            MotionSample::accelerometer(0, 9.0, 0.0, 0.0),
            MotionSample::accelerometer(200, 1.0, 0.0, 0.0),
        ];
        let events = run(&classifier, &samples);
        assert_eq!(kinds(&events), vec![AnomalyKind::SuddenHalt]);
        assert_relative_eq!(events[0].confidence, 0.75);
    }

    #[test]
    fn test_sudden_halt_needs_short_gap() {
        let classifier = SignalClassifier::with_defaults();
        let samples = [
            MotionSample::accelerometer(0, 9.0, 0.0, 0.0),
            MotionSample::accelerometer(600, 1.0, 0.0, 0.0),
        ];
        assert!(run(&classifier, &samples).is_empty());
    }

    #[test]
    fn test_prolonged_stationary_fires_once_and_rearms() {
        let classifier = SignalClassifier::with_defaults();
        let mut samples: Vec<_> = (0..=40)
            .map(|i| MotionSample::accelerometer(i * 1000, 0.5, 0.0, 0.0))
            .collect();
        samples.push(MotionSample::accelerometer(41_000, 3.0, 0.0, 0.0));
        samples.extend((42..=75).map(|i| MotionSample::accelerometer(i * 1000, 0.2, 0.0, 0.0)));

        let events = run(&classifier, &samples);
        let stationary: Vec<_> = events
            .iter()
            .filter(|e| e.kind == AnomalyKind::ProlongedStationary)
            .collect();
        assert_eq!(stationary.len(), 2);
        assert_eq!(stationary[0].timestamp_ms, 30_000);
        assert_eq!(stationary[1].timestamp_ms, 72_000);
    }

    #[test]
    fn test_stationary_resets_on_movement() {
        let classifier = SignalClassifier::with_defaults();
        let samples = [
            MotionSample::accelerometer(0, 0.5, 0.0, 0.0),
            MotionSample::accelerometer(29_000, 0.5, 0.0, 0.0),
            MotionSample::accelerometer(29_500, 1.2, 0.0, 0.0),
            MotionSample::accelerometer(31_000, 0.5, 0.0, 0.0),
        ];
        assert!(run(&classifier, &samples).is_empty());
    }

    #[test]
    fn test_unusual_rotation_independent_of_accel() {
        let classifier = SignalClassifier::with_defaults();
        let (events, state) = classifier.classify(
            &MotionSample::gyroscope(10, 2.0, 1.0, 0.5),
            ClassifierState::default(),
        );
        assert_eq!(kinds(&events), vec![AnomalyKind::UnusualRotation]);
        assert!(state.last_accel_ms.is_none());
    }

    #[test]
    fn test_running_pattern() {
        let classifier = SignalClassifier::with_defaults();
        let samples = [
            MotionSample::step(0),
            MotionSample::step(250),
            MotionSample::step(700),
        ];
        let events = run(&classifier, &samples);
        assert_eq!(kinds(&events), vec![AnomalyKind::RunningPattern]);
        assert_eq!(events[0].timestamp_ms, 250);
    }

    #[test]
    fn test_multiple_events_from_one_sample() {
        let classifier = SignalClassifier::with_defaults();
        let state = ClassifierState {
            last_magnitude: Some(5.0),
            last_accel_ms: Some(0),
            last_step_ms: Some(100),
            ..ClassifierState::default()
        };
        let sample = MotionSample {
            accel: Some(crate::domain::Vector3::new(16.0, 0.0, 0.0)),
            gyro: Some(crate::domain::Vector3::new(3.0, 0.0, 0.0)),
            step: true,
            timestamp_ms: 200,
        };
        let (events, _) = classifier.classify(&sample, state);
        assert_eq!(
            kinds(&events),
            vec![
                AnomalyKind::Sprint,
                AnomalyKind::UnusualRotation,
                AnomalyKind::RunningPattern
            ]
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let config = ClassifierConfig {
            rotation_magnitude: 5.0,
            ..ClassifierConfig::default()
        };
        let classifier = SignalClassifier::new(config);
        let events = run(&classifier, &[MotionSample::gyroscope(0, 3.0, 0.0, 0.0)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(ClassifierConfig::default().validate().is_ok());

        let bad = ClassifierConfig {
            sprint_confidence: 1.5,
            ..ClassifierConfig::default()
        };
        assert!(bad.validate().is_err());

        let inverted = ClassifierConfig {
            halt_current_magnitude: 9.0,
            ..ClassifierConfig::default()
        };
        assert!(inverted.validate().is_err());
    }
}
