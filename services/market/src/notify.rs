//! Outbound email notifications
//!
//! SMTP delivery via lettre. Notification sends are fire-and-forget:
//! they run on detached tasks and failures are logged, never surfaced
//! to the request that triggered them.

use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
}

impl EmailConfig {
    /// Create a new EmailConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SMTP_HOST`: SMTP relay host (default: smtp.gmail.com)
    /// - `SMTP_PORT`: SMTP relay port (default: 465)
    /// - `EMAIL_SENDER`: sender address, doubles as the SMTP username
    /// - `EMAIL_PASSWORD`: SMTP password
    pub fn from_env() -> Self {
        let smtp_host =
            std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let smtp_port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(465);
        let sender = std::env::var("EMAIL_SENDER").unwrap_or_default();
        let password = std::env::var("EMAIL_PASSWORD").unwrap_or_default();

        EmailConfig {
            smtp_host,
            smtp_port,
            sender,
            password,
        }
    }
}

/// Transactional mailer
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl Mailer {
    /// Build a mailer over implicit-TLS SMTP. The connection is lazy;
    /// nothing is contacted until the first send.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.sender.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            sender: config.sender.clone(),
        })
    }

    /// Send one plain-text email
    pub async fn send(&self, subject: &str, recipient: &str, body: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.sender.parse()?)
            .to(recipient.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport.send(email).await?;
        Ok(())
    }

    /// Send on a detached task; delivery failures are logged and
    /// swallowed so they can never fail the triggering request.
    pub fn send_detached(&self, subject: String, recipient: String, body: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&subject, &recipient, &body).await {
                warn!("Failed to send notification email to {recipient}: {e}");
            }
        });
    }
}
