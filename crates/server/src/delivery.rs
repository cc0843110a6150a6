//! One-time login code delivery.
//!
//! The issuer's password provider calls back with `(email, code)` whenever a
//! verification code is generated. The demo deployment only logs the code;
//! the SMTP sender delivers it by email through the configured relay.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{AppConfig, CodeDelivery, SmtpConfig};
use crate::error::DeliveryError;

/// Code-delivery callback contract for the issuer's password provider.
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError>;
}

/// Demo sender: the code only shows up in the service logs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogCodeSender;

#[async_trait]
impl CodeSender for LogCodeSender {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError> {
        tracing::info!(email = email, code = code, "Login code (check service logs)");
        Ok(())
    }
}

/// Sends codes by email over the configured SMTP relay.
pub struct SmtpCodeSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpCodeSender {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)?
            .port(config.port)
            .credentials(creds)
            .build();
        Ok(Self {
            mailer,
            from: config.from.parse()?,
        })
    }

    fn build_message(&self, email: &str, code: &str) -> Result<Message, DeliveryError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.parse()?)
            .subject("Your login code")
            .body(format!("Your one-time login code is: {code}\n"))?;
        Ok(message)
    }
}

#[async_trait]
impl CodeSender for SmtpCodeSender {
    async fn send_code(&self, email: &str, code: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(email, code)?;
        self.mailer.send(message).await?;
        tracing::info!(email = email, "Sent login code over SMTP");
        Ok(())
    }
}

/// Build the sender selected by configuration.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn CodeSender>, DeliveryError> {
    match config.code_delivery {
        CodeDelivery::Log => Ok(Arc::new(LogCodeSender)),
        CodeDelivery::Smtp => {
            let smtp = config.smtp.as_ref().ok_or(DeliveryError::MissingSmtpConfig)?;
            Ok(Arc::new(SmtpCodeSender::from_config(smtp)?))
        }
    }
}
