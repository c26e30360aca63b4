//! Batched email delivery: one backend call per dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::NotificationChannel;
use crate::domain::{AlertPayload, ChannelKind, Contact, DispatchOutcome};
use crate::error::ChannelError;

/// One addressee of a batched email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRecipient {
    /// Contact name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Request body for the email backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailBatch {
    /// Everybody who should receive the alert
    pub recipients: Vec<EmailRecipient>,
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: String,
    /// Display name of the person in distress
    pub sender_name: String,
    /// Map link or placeholder
    pub location: String,
}

/// Port over the remote email endpoint
#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send the whole batch in one call
    async fn invoke(&self, batch: &EmailBatch) -> Result<(), ChannelError>;
}

/// Email notification channel
pub struct EmailChannel {
    gateway: Arc<dyn EmailGateway>,
}

impl EmailChannel {
    /// Create a channel over `gateway`
    pub fn new(gateway: Arc<dyn EmailGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, contacts: &[Contact], payload: &AlertPayload) -> Vec<DispatchOutcome> {
        let recipients: Vec<EmailRecipient> = contacts
            .iter()
            .filter_map(|c| {
                c.email_address().map(|email| EmailRecipient {
                    name: c.name.clone(),
                    email: email.to_string(),
                })
            })
            .collect();

        if recipients.is_empty() {
            return Vec::new();
        }

        let batch = EmailBatch {
            recipients,
            subject: payload.title.clone(),
            body: payload.body.clone(),
            sender_name: payload.sender_name.clone(),
            location: payload.location.clone(),
        };

        let result = self.gateway.invoke(&batch).await;
        if let Err(e) = &result {
            tracing::warn!(recipients = batch.recipients.len(), error = %e, "Email batch failed");
        }

        contacts
            .iter()
            .filter(|c| c.email_address().is_some())
            .map(|c| match &result {
                Ok(()) => DispatchOutcome::delivered(ChannelKind::Email, c.id.clone()),
                Err(e) => DispatchOutcome::failed(ChannelKind::Email, c.id.clone(), e.to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RecordingEmailGateway;
    use crate::domain::SessionId;

    fn payload() -> AlertPayload {
        AlertPayload {
            session_id: SessionId::new(),
            title: "Emergency".into(),
            body: "Help".into(),
            sender_name: "Ola".into(),
            location: "Location unavailable".into(),
            timestamp: chrono::Utc::now(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_single_call_for_batch() {
        let gateway = Arc::new(RecordingEmailGateway::new());
        let channel = EmailChannel::new(gateway.clone());
        let contacts = vec![
            Contact::new("a", "A", "+1").with_email("a@example.com"),
            Contact::new("b", "B", "+2").with_email("b@example.com"),
        ];

        let outcomes = channel.send(&contacts, &payload()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success));

        let batches = gateway.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].recipients.len(), 2);
        assert_eq!(batches[0].subject, "Emergency");
    }

    #[tokio::test]
    async fn test_batch_failure_marks_every_recipient() {
        let gateway = Arc::new(RecordingEmailGateway::new().failing());
        let channel = EmailChannel::new(gateway);
        let contacts = vec![Contact::new("a", "A", "+1").with_email("a@example.com")];

        let outcomes = channel.send(&contacts, &payload()).await;
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
    }

    #[tokio::test]
    async fn test_no_addresses_no_call() {
        let gateway = Arc::new(RecordingEmailGateway::new());
        let channel = EmailChannel::new(gateway.clone());
        let outcomes = channel.send(&[Contact::new("a", "A", "+1")], &payload()).await;
        assert!(outcomes.is_empty());
        assert!(gateway.batches().is_empty());
    }
}
