//! services/bot/src/adapters/mail.rs
//!
//! This module contains the adapter for outgoing mail. It implements the
//! `MailTransport` port from the `core` crate using SMTP with STARTTLS.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use wellness_core::ports::{MailTransport, PortError, PortResult};

use crate::error::BotError;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `MailTransport` port over SMTP.
pub struct SmtpMailAdapter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailAdapter {
    /// Creates a new `SmtpMailAdapter` speaking STARTTLS to `host`.
    pub fn new(
        host: &str,
        username: String,
        password: String,
        from: &str,
    ) -> Result<Self, BotError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| BotError::Internal(format!("SMTP relay setup failed: {e}")))?
            .credentials(Credentials::new(username, password))
            .build();

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| BotError::Internal(format!("invalid sender address '{from}': {e}")))?;

        Ok(Self { transport, from })
    }
}

//=========================================================================================
// `MailTransport` Trait Implementation
//=========================================================================================

#[async_trait]
impl MailTransport for SmtpMailAdapter {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|e| PortError::Unexpected(format!("invalid recipient '{to}': {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
