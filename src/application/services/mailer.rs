use async_trait::async_trait;

use crate::services::MailError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// The organisation's own inbox.
    Staff,
    Address(String),
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Recipient,
    pub subject: String,
    pub text: String,
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}
