//! Mock mailer for tests
//!
//! Records every delivery in memory so tests can assert on what jobs
//! would have sent. Can be configured to fail to exercise error paths.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{Mailer, MailerError, MailerResult, OutboundEmail};

/// In-memory mailer that records deliveries instead of sending them
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mailer whose every send fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Snapshot of every email delivered so far
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of emails delivered so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Mailer for MockMailer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, email: OutboundEmail) -> MailerResult<()> {
        if self.fail {
            return Err(MailerError::DeliveryFailed(
                "mock transport configured to fail".to_string(),
            ));
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}
