use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use tripdesk_core::config::{MailConfig, MailTransportKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailerError {
    #[error("mail transport configuration: {0}")]
    Configuration(String),
    #[error("failed to render mail template: {0}")]
    Template(String),
    #[error("failed to build mail message: {0}")]
    Build(String),
    #[error("failed to send mail: {0}")]
    Send(String),
}

/// A fully rendered outbound email. The sender address belongs to the
/// transport, not the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// STARTTLS SMTP delivery via `lettre`.
#[derive(Debug)]
pub struct SmtpMailTransport {
    from: Mailbox,
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn from_config(config: &MailConfig) -> Result<Self, MailerError> {
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| MailerError::Configuration(format!("mail.from_address: {e}")))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| MailerError::Configuration(e.to_string()))?
                .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder
                .credentials(Credentials::new(username.clone(), password.expose_secret().to_owned()));
        }

        Ok(Self { from, inner: builder.build() })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailerError::Build(format!("recipient address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| MailerError::Build(e.to_string()))?;

        self.inner.send(email).await.map_err(|e| MailerError::Send(e.to_string()))?;
        Ok(())
    }
}

/// Local-development transport: writes the message to the log instead of
/// the network.
#[derive(Default)]
pub struct ConsoleMailTransport;

#[async_trait]
impl MailTransport for ConsoleMailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "mail delivered to console transport"
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct NoopMailTransport;

#[async_trait]
impl MailTransport for NoopMailTransport {
    async fn send(&self, _message: &EmailMessage) -> Result<(), MailerError> {
        Ok(())
    }
}

/// Select the delivery transport the configuration asks for.
pub fn transport_from_config(config: &MailConfig) -> Result<Arc<dyn MailTransport>, MailerError> {
    match config.transport {
        MailTransportKind::Smtp => Ok(Arc::new(SmtpMailTransport::from_config(config)?)),
        MailTransportKind::Console => Ok(Arc::new(ConsoleMailTransport)),
        MailTransportKind::Noop => Ok(Arc::new(NoopMailTransport)),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use tripdesk_core::config::{MailConfig, MailTransportKind};

    use super::{
        transport_from_config, ConsoleMailTransport, EmailMessage, MailTransport, MailerError,
        NoopMailTransport, SmtpMailTransport,
    };

    fn smtp_config() -> MailConfig {
        MailConfig {
            transport: MailTransportKind::Smtp,
            from_address: "no-reply@tripdesk.test".to_string(),
            smtp_host: "smtp.tripdesk.test".to_string(),
            smtp_port: 587,
            smtp_username: Some("tripdesk".to_string()),
            smtp_password: Some(SecretString::from("app-password".to_string())),
            max_retries: 2,
        }
    }

    fn message() -> EmailMessage {
        EmailMessage {
            to: "freya@tripdesk.test".to_string(),
            subject: "Your travel request has been approved!".to_string(),
            body: "Hello, Freya Larsen!".to_string(),
        }
    }

    #[tokio::test]
    async fn console_and_noop_transports_accept_messages() {
        ConsoleMailTransport.send(&message()).await.expect("console send");
        NoopMailTransport.send(&message()).await.expect("noop send");
    }

    #[test]
    fn smtp_transport_builds_with_credentials() {
        SmtpMailTransport::from_config(&smtp_config()).expect("smtp transport should build");
    }

    #[test]
    fn smtp_transport_rejects_unparseable_from_address() {
        let config = MailConfig { from_address: "not an address".to_string(), ..smtp_config() };

        let error = SmtpMailTransport::from_config(&config).expect_err("should fail");
        assert!(matches!(error, MailerError::Configuration(_)));
    }

    #[tokio::test]
    async fn smtp_transport_rejects_unparseable_recipient() {
        let transport = SmtpMailTransport::from_config(&smtp_config()).expect("build");
        let bad = EmailMessage { to: "not an address".to_string(), ..message() };

        let error = transport.send(&bad).await.expect_err("should fail before the network");
        assert!(matches!(error, MailerError::Build(_)));
    }

    #[test]
    fn factory_honors_the_configured_kind() {
        let console =
            MailConfig { transport: MailTransportKind::Console, ..smtp_config() };
        transport_from_config(&console).expect("console transport");

        let noop = MailConfig { transport: MailTransportKind::Noop, ..smtp_config() };
        transport_from_config(&noop).expect("noop transport");
    }
}
