//! Motion samples and the anomaly events classified from them.

use serde::{Deserialize, Serialize};

/// A three-axis sensor reading in the sensor's native units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X axis
    pub x: f64,
    /// Y axis
    pub y: f64,
    /// Z axis
    pub z: f64,
}

impl Vector3 {
    /// Create a new vector
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One event from the device motion sensors.
///
/// Platform sensors deliver accelerometer, gyroscope and step-detector
/// callbacks independently, so each reading is optional. Acceleration is
/// expected gravity-compensated (linear acceleration, m/s²); rotation is in
/// rad/s. Timestamps are monotonic milliseconds from an arbitrary epoch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionSample {
    /// Linear acceleration, if this event carries one
    #[serde(default)]
    pub accel: Option<Vector3>,
    /// Angular velocity, if this event carries one
    #[serde(default)]
    pub gyro: Option<Vector3>,
    /// Whether the step detector fired
    #[serde(default)]
    pub step: bool,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl MotionSample {
    /// An accelerometer-only event
    pub fn accelerometer(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            accel: Some(Vector3::new(x, y, z)),
            timestamp_ms,
            ..Self::default()
        }
    }

    /// A gyroscope-only event
    pub fn gyroscope(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self {
            gyro: Some(Vector3::new(x, y, z)),
            timestamp_ms,
            ..Self::default()
        }
    }

    /// A step-detector event
    pub fn step(timestamp_ms: u64) -> Self {
        Self {
            step: true,
            timestamp_ms,
            ..Self::default()
        }
    }

    /// Acceleration magnitude, if present
    pub fn accel_magnitude(&self) -> Option<f64> {
        self.accel.as_ref().map(Vector3::magnitude)
    }

    /// Rotation magnitude, if present
    pub fn gyro_magnitude(&self) -> Option<f64> {
        self.gyro.as_ref().map(Vector3::magnitude)
    }
}

/// Kinds of safety-relevant motion patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Sudden burst of high acceleration
    Sprint,
    /// Fast movement that stops abruptly
    SuddenHalt,
    /// No movement for an extended period
    ProlongedStationary,
    /// Violent or unusual device rotation
    UnusualRotation,
    /// Step cadence consistent with running
    RunningPattern,
}

impl AnomalyKind {
    /// All kinds, in declaration order
    pub const ALL: [AnomalyKind; 5] = [
        AnomalyKind::Sprint,
        AnomalyKind::SuddenHalt,
        AnomalyKind::ProlongedStationary,
        AnomalyKind::UnusualRotation,
        AnomalyKind::RunningPattern,
    ];

    /// Short human-readable description
    pub fn describe(&self) -> &'static str {
        match self {
            AnomalyKind::Sprint => "sudden sprint detected",
            AnomalyKind::SuddenHalt => "sudden halt detected",
            AnomalyKind::ProlongedStationary => "no movement for an extended period",
            AnomalyKind::UnusualRotation => "unusual device rotation",
            AnomalyKind::RunningPattern => "running pattern detected",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::Sprint => write!(f, "SPRINT"),
            AnomalyKind::SuddenHalt => write!(f, "SUDDEN_HALT"),
            AnomalyKind::ProlongedStationary => write!(f, "PROLONGED_STATIONARY"),
            AnomalyKind::UnusualRotation => write!(f, "UNUSUAL_ROTATION"),
            AnomalyKind::RunningPattern => write!(f, "RUNNING_PATTERN"),
        }
    }
}

/// A classified motion pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    /// What was detected
    pub kind: AnomalyKind,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Timestamp of the sample that produced the event
    pub timestamp_ms: u64,
}

impl AnomalyEvent {
    /// Create a new event, clamping confidence into [0, 1]
    pub fn new(kind: AnomalyKind, confidence: f64, timestamp_ms: u64) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        let v = Vector3::new(3.0, 4.0, 12.0);
        assert!((v.magnitude() - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_constructors() {
        let a = MotionSample::accelerometer(10, 1.0, 0.0, 0.0);
        assert_eq!(a.accel_magnitude(), Some(1.0));
        assert!(a.gyro_magnitude().is_none());
        assert!(!a.step);

        let s = MotionSample::step(20);
        assert!(s.step);
        assert!(s.accel.is_none());
    }

    #[test]
    fn test_confidence_clamped() {
        let e = AnomalyEvent::new(AnomalyKind::Sprint, 1.7, 0);
        assert_eq!(e.confidence, 1.0);
    }

    #[test]
    fn test_sample_deserializes_with_missing_fields() {
        let s: MotionSample =
            serde_json::from_str(r#"{"gyro":{"x":1.0,"y":2.0,"z":2.0},"timestamp_ms":5}"#).unwrap();
        assert_eq!(s.gyro_magnitude(), Some(3.0));
        assert!(!s.step);
    }
}
