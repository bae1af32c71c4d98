//! Port for outbound email notifications.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use super::define_port_error;

/// Templated email handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    /// Subject line.
    pub subject: String,
    /// Template identifier rendered by the delivery provider.
    pub template: String,
    /// Values substituted into the template.
    pub fields: BTreeMap<String, String>,
}

impl EmailMessage {
    /// Start a message for `template`.
    pub fn new(subject: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            template: template.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a template value.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }
}

define_port_error! {
    /// Errors raised by notifier adapters.
    pub enum NotifierError {
        /// The delivery provider could not be reached.
        Unavailable { message: String } => "notifier unavailable: {message}",
        /// The provider refused the message.
        Rejected { message: String } => "notification rejected: {message}",
    }
}

/// Delivers email notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` to `to`.
    async fn send_email(&self, to: &str, message: &EmailMessage) -> Result<(), NotifierError>;
}
