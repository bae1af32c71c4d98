//! Notifier that writes outgoing email to the structured log.
//!
//! Used by the command-line front end, where the recipient is the operator
//! reading the log rather than a mailbox.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{EmailMessage, Notifier, NotifierError};

/// Logs every message at `info` with its template fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, to: &str, message: &EmailMessage) -> Result<(), NotifierError> {
        info!(
            to,
            subject = %message.subject,
            template = %message.template,
            fields = ?message.fields,
            "email dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn log_notifier_accepts_every_message() {
        let message = EmailMessage::new("Verify", "account_verification").with_field("link", "x");
        LogNotifier
            .send_email("ada@example.com", &message)
            .await
            .expect("logging never fails");
    }
}
