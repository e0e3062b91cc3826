//! Outbound mail abstraction.
//!
//! Delivery is fire-and-forget from the caller's point of view: flows log a
//! failed send and carry on. `LogEmailSender` is the local-dev sender and
//! writes the message to the log instead of a mail server.

use anyhow::Result;
use std::sync::Mutex;
use tracing::info;

pub const DEFAULT_FROM_EMAIL: &str = "noreply@fileshare.dev";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error describing why it failed.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            from = DEFAULT_FROM_EMAIL,
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

/// Keeps every message in memory; handy for inspecting what a flow sent.
#[derive(Debug, Default)]
pub struct OutboxEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl OutboxEmailSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map_or_else(|poisoned| poisoned.into_inner().clone(), |sent| sent.clone())
    }
}

impl EmailSender for OutboxEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut sent = match self.sent.lock() {
            Ok(sent) => sent,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push(message.clone());
        Ok(())
    }
}
