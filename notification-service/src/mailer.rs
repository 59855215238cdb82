use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// A plain-text message addressed to one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay returned status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), MailError>;
}

/// Posts notifications as JSON to an HTTP mail relay.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    url: String,
    bearer: Option<String>,
}

impl HttpMailer {
    pub fn new(client: Client, url: impl Into<String>, bearer: Option<String>) -> Self {
        Self { client, url: url.into(), bearer }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        let mut request = self.client.post(&self.url).json(notification);
        if let Some(token) = self.bearer.as_deref() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Used when no relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), MailError> {
        info!(to = %notification.to, subject = %notification.subject, "notification (log only)");
        Ok(())
    }
}
