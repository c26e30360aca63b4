//! Notification channels the dispatcher fans out to.
//!
//! Each channel wraps an opaque transport (SMS carrier, push gateway, email
//! backend) and turns every per-contact result, including transport errors,
//! into a [`DispatchOutcome`]. A channel never returns an error to the
//! dispatcher.

mod email;
mod push;
mod sms;

pub use email::{EmailBatch, EmailChannel, EmailGateway, EmailRecipient};
pub use push::{PushChannel, PushGateway};
pub use sms::{split_segments, SmsChannel, SmsTransport};

use async_trait::async_trait;

use crate::domain::{AlertPayload, ChannelKind, Contact, DispatchOutcome};

/// A notification sink driven uniformly by the dispatcher
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Which transport this is
    fn kind(&self) -> ChannelKind;

    /// Whether `contact` has an address on this channel
    fn accepts(&self, contact: &Contact) -> bool {
        match self.kind() {
            ChannelKind::Sms => contact.sms_address().is_some(),
            ChannelKind::Push => contact.push_address().is_some(),
            ChannelKind::Email => contact.email_address().is_some(),
        }
    }

    /// Deliver `payload` to every contact in `contacts`.
    ///
    /// `contacts` has already been filtered with [`Self::accepts`]. Returns one
    /// outcome per contact.
    async fn send(&self, contacts: &[Contact], payload: &AlertPayload) -> Vec<DispatchOutcome>;
}

/// The contacts of `all` that `channel` can reach
pub fn eligible(channel: &dyn NotificationChannel, all: &[Contact]) -> Vec<Contact> {
    all.iter().filter(|c| channel.accepts(c)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapter::RecordingSmsTransport;

    #[test]
    fn test_eligible_filters_by_address() {
        let channel = SmsChannel::new(Arc::new(RecordingSmsTransport::new()), 160);
        let contacts = vec![
            Contact::new("a", "A", "+1555"),
            Contact::new("b", "B", "").with_push_token("tok"),
        ];
        let reachable = eligible(&channel, &contacts);
        assert_eq!(reachable.len(), 1);
        assert_eq!(reachable[0].id.as_str(), "a");
    }
}
