//! Console transports: print what would have been sent.

use std::collections::BTreeMap;

use async_trait::async_trait;
use colored::Colorize;

use guardian_sos::channels::{EmailBatch, EmailGateway, PushGateway, SmsTransport};
use guardian_sos::ChannelError;

/// SMS transport printing each message
#[derive(Debug, Default)]
pub struct ConsoleSms {
    /// Reject every send as if the carrier were down
    pub fail: bool,
}

#[async_trait]
impl SmsTransport for ConsoleSms {
    fn has_permission(&self) -> bool {
        true
    }

    async fn send_multipart(&self, phone: &str, parts: &[String]) -> Result<(), ChannelError> {
        if self.fail {
            println!("  {} {} {}", "[sms]".magenta(), phone, "REJECTED".red());
            return Err(ChannelError::transport("simulated carrier failure"));
        }
        for (i, part) in parts.iter().enumerate() {
            println!(
                "  {} {} ({}/{}): {}",
                "[sms]".magenta(),
                phone,
                i + 1,
                parts.len(),
                part
            );
        }
        Ok(())
    }
}

/// Push gateway printing each notification
#[derive(Debug, Default)]
pub struct ConsolePush;

#[async_trait]
impl PushGateway for ConsolePush {
    async fn invoke(
        &self,
        token: &str,
        title: &str,
        _body: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<(), ChannelError> {
        println!(
            "  {} {} \"{}\" ({} metadata keys)",
            "[push]".blue(),
            token,
            title,
            metadata.len()
        );
        Ok(())
    }
}

/// Email gateway printing the batch
#[derive(Debug, Default)]
pub struct ConsoleEmail;

#[async_trait]
impl EmailGateway for ConsoleEmail {
    async fn invoke(&self, batch: &EmailBatch) -> Result<(), ChannelError> {
        let to: Vec<&str> = batch.recipients.iter().map(|r| r.email.as_str()).collect();
        println!(
            "  {} to {} subject \"{}\"",
            "[email]".cyan(),
            to.join(", "),
            batch.subject
        );
        Ok(())
    }
}
