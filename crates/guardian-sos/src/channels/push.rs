//! Push notification delivery through a callable gateway.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use super::NotificationChannel;
use crate::domain::{AlertPayload, ChannelKind, Contact, DispatchOutcome};
use crate::error::ChannelError;

/// Port over the remote push endpoint
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one notification to one device token
    async fn invoke(
        &self,
        token: &str,
        title: &str,
        body: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ChannelError>;
}

/// Push notification channel; one gateway call per contact
pub struct PushChannel {
    gateway: Arc<dyn PushGateway>,
}

impl PushChannel {
    /// Create a channel over `gateway`
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }

    async fn send_one(
        &self,
        contact: &Contact,
        payload: &AlertPayload,
        metadata: &BTreeMap<String, String>,
    ) -> DispatchOutcome {
        let Some(token) = contact.push_address() else {
            return DispatchOutcome::failed(
                ChannelKind::Push,
                contact.id.clone(),
                ChannelError::MissingAddress.to_string(),
            );
        };

        match self
            .gateway
            .invoke(token, &payload.title, &payload.body, metadata)
            .await
        {
            Ok(()) => DispatchOutcome::delivered(ChannelKind::Push, contact.id.clone()),
            Err(e) => {
                tracing::warn!(contact_id = %contact.id, error = %e, "Push delivery failed");
                DispatchOutcome::failed(ChannelKind::Push, contact.id.clone(), e.to_string())
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn send(&self, contacts: &[Contact], payload: &AlertPayload) -> Vec<DispatchOutcome> {
        let mut metadata = payload.metadata.clone();
        metadata.insert("sessionId".into(), payload.session_id.to_string());
        metadata.insert("senderName".into(), payload.sender_name.clone());
        metadata.insert("location".into(), payload.location.clone());
        metadata.insert("timestamp".into(), payload.timestamp.timestamp_millis().to_string());

        join_all(contacts.iter().map(|c| self.send_one(c, payload, &metadata))).await
    }
}
