//! # Guardian SOS
//!
//! Emergency alert dispatch and motion-anomaly detection for a personal
//! safety device.
//!
//! ## Features
//!
//! - **Motion Classification**: Sprint, sudden halt, prolonged stillness,
//!   unusual rotation and running cadence from accelerometer, gyroscope and
//!   step events
//! - **SOS Lifecycle**: Cancellable countdown, forward-only state machine,
//!   automatic reset after the outcome is shown
//! - **Multi-channel Dispatch**: SMS, push and email fanned out concurrently
//!   with per-contact outcomes
//! - **Persistence**: Public alert record for responders plus a private
//!   history entry
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       guardian-sos                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌───────────┐      ┌───────────────┐    ┌────────────┐  │
//! │  │ Detection │─────▶│   Alerting    │───▶│  Channels  │  │
//! │  │  Context  │ auto │ (dispatcher)  │    │ sms/push/  │  │
//! │  └───────────┘      └───────┬───────┘    │   email    │  │
//! │                             │            └────────────┘  │
//! │                    ┌────────▼────────┐                   │
//! │                    │ Ports: contacts │                   │
//! │                    │ store, location │                   │
//! │                    └─────────────────┘                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use guardian_sos::adapter::{InMemoryAlertStore, RecordingSmsTransport, StaticContactRepository};
//! use guardian_sos::channels::SmsChannel;
//! use guardian_sos::{AlertDispatcher, Contact, UserProfile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let contacts = vec![Contact::new("c1", "Alex", "+15550100")];
//!
//!     let dispatcher = AlertDispatcher::builder(UserProfile::new("user-1", "Sam"))
//!         .contacts(Arc::new(StaticContactRepository::new(contacts)))
//!         .store(Arc::new(InMemoryAlertStore::new()))
//!         .channel(Arc::new(SmsChannel::new(Arc::new(RecordingSmsTransport::new()), 160)))
//!         .build()?;
//!
//!     dispatcher.start_countdown(Duration::from_secs(5));
//!     let mut updates = dispatcher.subscribe();
//!     while updates.changed().await.is_ok() {
//!         println!("{:?}", updates.borrow().state);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapter;
pub mod alerting;
pub mod channels;
pub mod config;
pub mod detection;
pub mod domain;
pub mod error;
pub mod location;
pub mod port;

pub use domain::{
    contact::{Contact, ContactId},
    location::{location_reference, FixSource, LocationFix, LOCATION_UNAVAILABLE},
    motion::{AnomalyEvent, AnomalyKind, MotionSample, Vector3},
    outcome::{ChannelKind, DispatchOutcome, DispatchSummary},
    payload::AlertPayload,
    records::{AlertRecord, AlertStatus, HistoryRecord, RecordId, RiskLevel},
    session::{AlertSession, FailureKind, SessionId, SosState, TriggerSource},
};

pub use detection::{AnomalyConsumer, ClassifierConfig, ClassifierState, MotionMonitor, SignalClassifier};

pub use alerting::{
    AlertDispatcher, AutoTrigger, DispatchConfig, MessageComposer, SosSnapshot, StartOutcome,
    TriggerPolicy, UserProfile,
};

pub use channels::NotificationChannel;
pub use config::GuardianConfig;
pub use error::{ChannelError, ConfigError, GuardianError, StoreError};
pub use location::{LocationProvider, LocationResolver};
pub use port::{AlertStore, ContactRepository};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for SOS operations
pub type Result<T> = std::result::Result<T, GuardianError>;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AlertDispatcher, AnomalyConsumer, AnomalyKind, AutoTrigger, Contact, GuardianConfig,
        GuardianError, MotionMonitor, MotionSample, Result, SignalClassifier, SosSnapshot, SosState,
        StartOutcome, TriggerSource, UserProfile,
    };
}
