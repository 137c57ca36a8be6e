use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::infrastructure::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// Fire-and-forget delivery. Failures surface to the caller, nothing retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            body = %message.text,
            "email captured by log mailer"
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP mail relay.
#[derive(Clone)]
pub struct RelayMailer {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl RelayMailer {
    pub fn new(endpoint: String, token: Option<String>) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            endpoint,
            token,
        })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            error!(status = status.as_u16(), to = ?message.to, "mail relay rejected message");
            return Err(MailError::Rejected(status.as_u16()));
        }
        info!(to = ?message.to, subject = %message.subject, "email handed to relay");
        Ok(())
    }
}

/// Picks the relay when one is configured, the log mailer otherwise.
pub fn mailer_from_config(config: &MailConfig) -> Result<Box<dyn Mailer>, MailError> {
    match &config.relay_url {
        Some(url) => Ok(Box::new(RelayMailer::new(
            url.clone(),
            config.relay_token.clone(),
        )?)),
        None => Ok(Box::new(LogMailer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let message = EmailMessage {
            from: "blog@localhost".into(),
            to: vec!["bob@example.com".into()],
            subject: "hi".into(),
            text: "hello".into(),
        };
        assert!(LogMailer.send(message).await.is_ok());
    }

    #[test]
    fn relay_is_used_only_when_configured() {
        let config = MailConfig {
            relay_url: Some("http://127.0.0.1:9/send".into()),
            ..MailConfig::default()
        };
        assert!(mailer_from_config(&config).is_ok());
        assert!(mailer_from_config(&MailConfig::default()).is_ok());
    }
}
