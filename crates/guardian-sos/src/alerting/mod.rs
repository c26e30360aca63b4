//! Alerting module for SOS dispatch.
//!
//! This module provides:
//! - Message composition for contacts
//! - The dispatcher that owns the SOS lifecycle and fans out to channels
//! - Automatic triggering from motion anomalies

mod composer;
mod dispatcher;
mod trigger;

pub use composer::MessageComposer;
pub use dispatcher::{
    AlertDispatcher, DispatchConfig, DispatcherBuilder, SosSnapshot, StartOutcome, UserProfile,
    CANCELLED_MESSAGE, DELIVERY_FAILED_MESSAGE, INFRASTRUCTURE_MESSAGE, NO_CONTACTS_MESSAGE,
};
pub use trigger::{AutoTrigger, TriggerPolicy};
