//! Detection module for motion anomalies.
//!
//! This module provides:
//! - A threshold classifier over accelerometer, gyroscope and step events
//! - A monitor that drives a sensor stream and notifies a consumer

mod classifier;
mod monitor;

pub use classifier::{ClassifierConfig, ClassifierState, SignalClassifier};
pub use monitor::{notify, AnomalyConsumer, MotionMonitor};
