//! SMS delivery with multi-part splitting.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use super::NotificationChannel;
use crate::domain::{AlertPayload, ChannelKind, Contact, DispatchOutcome};
use crate::error::ChannelError;

/// Port over the device SMS transport
#[async_trait]
pub trait SmsTransport: Send + Sync {
    /// Whether the app holds the send-SMS permission
    fn has_permission(&self) -> bool;

    /// Send an ordered multi-part message to one number.
    ///
    /// Delivery is all-or-nothing: an error means the contact must be
    /// treated as not reached.
    async fn send_multipart(&self, phone: &str, parts: &[String]) -> Result<(), ChannelError>;
}

/// Split `text` into ordered segments of at most `max_chars` characters.
///
/// Splits on character boundaries, never inside a UTF-8 sequence.
pub fn split_segments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// SMS notification channel
pub struct SmsChannel {
    transport: Arc<dyn SmsTransport>,
    segment_chars: usize,
}

impl SmsChannel {
    /// Create a channel over `transport` with the carrier's segment size
    pub fn new(transport: Arc<dyn SmsTransport>, segment_chars: usize) -> Self {
        Self {
            transport,
            segment_chars,
        }
    }

    async fn send_one(&self, contact: &Contact, parts: &[String]) -> DispatchOutcome {
        let Some(phone) = contact.sms_address() else {
            return DispatchOutcome::failed(
                ChannelKind::Sms,
                contact.id.clone(),
                ChannelError::MissingAddress.to_string(),
            );
        };

        match self.transport.send_multipart(phone, parts).await {
            Ok(()) => {
                tracing::debug!(contact_id = %contact.id, parts = parts.len(), "SMS sent");
                DispatchOutcome::delivered(ChannelKind::Sms, contact.id.clone())
            }
            Err(e) => {
                tracing::warn!(contact_id = %contact.id, error = %e, "SMS delivery failed");
                DispatchOutcome::failed(ChannelKind::Sms, contact.id.clone(), e.to_string())
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, contacts: &[Contact], payload: &AlertPayload) -> Vec<DispatchOutcome> {
        if !self.transport.has_permission() {
            tracing::warn!(contacts = contacts.len(), "SMS permission not granted");
            let error = ChannelError::PermissionDenied("SEND_SMS".into()).to_string();
            return contacts
                .iter()
                .map(|c| DispatchOutcome::failed(ChannelKind::Sms, c.id.clone(), error.clone()))
                .collect();
        }

        let parts = split_segments(&payload.body, self.segment_chars);
        join_all(contacts.iter().map(|c| self.send_one(c, &parts))).await
    }
}
