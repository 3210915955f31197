use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::{
    application::services::{EmailMessage, Mailer, Recipient},
    domain::config::secrets::MailSecrets,
    services::error::MailError,
};

const MAIL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Transactional mail over a JSON HTTP API (`POST {base}/emails`, bearer key).
pub struct HttpMailer {
    client: Client,
    secrets: MailSecrets,
}

impl HttpMailer {
    pub fn new(client: Client, secrets: MailSecrets) -> Self {
        Self { client, secrets }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let to = match &message.to {
            Recipient::Staff => self.secrets.notify_to.as_str(),
            Recipient::Address(address) => address.as_str(),
        };

        let response = self
            .client
            .post(format!(
                "{}/emails",
                self.secrets.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&self.secrets.api_key)
            .json(&SendEmailRequest {
                from: &self.secrets.from,
                to: [to],
                subject: &message.subject,
                text: &message.text,
                reply_to: message.reply_to.as_deref(),
            })
            .timeout(MAIL_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Email '{}' sent", message.subject);
        Ok(())
    }
}

/// Used when no mail provider is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            to = ?message.to,
            "Mail provider not configured, dropping email '{}'",
            message.subject
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    #[tokio::test]
    async fn staff_notifications_go_to_configured_inbox() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/emails")
            .match_header("authorization", "Bearer re_test")
            .match_body(Matcher::Json(serde_json::json!({
                "from": "site@example.org",
                "to": ["team@example.org"],
                "subject": "New contact message",
                "text": "hello",
                "reply_to": "ada@example.com"
            })))
            .with_status(200)
            .with_body(r#"{"id":"email_1"}"#)
            .create_async()
            .await;

        let mailer = HttpMailer::new(
            Client::new(),
            MailSecrets {
                api_key: "re_test".into(),
                from: "site@example.org".into(),
                notify_to: "team@example.org".into(),
                api_base: server.url(),
            },
        );

        mailer
            .send(EmailMessage {
                to: Recipient::Staff,
                subject: "New contact message".into(),
                text: "hello".into(),
                reply_to: Some("ada@example.com".into()),
            })
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_rejection_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/emails")
            .with_status(422)
            .with_body(r#"{"message":"invalid from"}"#)
            .create_async()
            .await;

        let mailer = HttpMailer::new(
            Client::new(),
            MailSecrets {
                api_key: "re_test".into(),
                from: "bad".into(),
                notify_to: "team@example.org".into(),
                api_base: server.url(),
            },
        );

        let err = mailer
            .send(EmailMessage {
                to: Recipient::Address("ada@example.com".into()),
                subject: "Thanks".into(),
                text: "thanks".into(),
                reply_to: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::Rejected { status: 422, .. }));
    }
}
