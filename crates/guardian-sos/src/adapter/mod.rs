//! Adapters implementing the ports with in-process fakes.
//!
//! These back the simulator binary and the test-suite; production builds
//! plug in platform transports instead.

mod memory;

pub use memory::{
    InMemoryAlertStore, RecordingEmailGateway, RecordingPushGateway, RecordingSmsTransport,
    StaticContactRepository, StaticLocationProvider,
};
