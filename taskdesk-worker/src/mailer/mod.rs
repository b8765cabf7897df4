/// Outbound email delivery
///
/// Jobs talk to a [`Mailer`] trait object, never to a transport directly,
/// so tests can record deliveries and a real SMTP or API transport can be
/// dropped in later without touching job logic.
///
/// # Implementations
///
/// - [`log::LogMailer`]: writes deliveries to the log; the default until a
///   real transport is configured
/// - [`mock::MockMailer`]: records deliveries in memory for tests

pub mod log;
pub mod mock;

pub use self::log::LogMailer;
pub use self::mock::MockMailer;

use async_trait::async_trait;

/// Mailer error types
#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// Delivery failed
    #[error("Email delivery failed: {0}")]
    DeliveryFailed(String),

    /// Recipient address is unusable
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// Mailer result type alias
pub type MailerResult<T> = Result<T, MailerError>;

/// One email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Plain-text body
    pub body: String,
}

/// Email delivery contract implemented by every transport
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name, for logs
    fn name(&self) -> &str;

    /// Delivers one email
    ///
    /// # Errors
    ///
    /// Returns `MailerError` if delivery fails; callers decide whether the
    /// failure is retryable.
    async fn send(&self, email: OutboundEmail) -> MailerResult<()>;
}
