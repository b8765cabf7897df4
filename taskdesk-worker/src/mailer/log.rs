//! Log-backed mailer
//!
//! Writes every delivery to the structured log instead of sending it.
//! Serves as the default transport until SMTP credentials are configured.

use async_trait::async_trait;
use tracing::info;

use super::{Mailer, MailerError, MailerResult, OutboundEmail};

/// Mailer that logs deliveries rather than sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, email: OutboundEmail) -> MailerResult<()> {
        if email.to.is_empty() {
            return Err(MailerError::InvalidRecipient(
                "empty recipient address".to_string(),
            ));
        }

        info!(
            to = %email.to,
            subject = %email.subject,
            body_bytes = email.body.len(),
            "Email delivered to log transport"
        );

        Ok(())
    }
}
