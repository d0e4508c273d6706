//! Account emails: registration confirmation and password recovery.
//!
//! [`SmtpEmailSender`] wraps the `lettre` async SMTP transport. When no SMTP
//! host is configured [`LoggingEmailSender`] is used instead and only records
//! that a message would have been sent.

use crate::config::EmailConfig;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_confirmation_email(&self, to: &str, code: &str) -> Result<(), EmailError>;

    async fn send_password_recovery_email(&self, to: &str, code: &str) -> Result<(), EmailError>;
}

/// Which account email to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEmail {
    Confirmation,
    PasswordRecovery,
}

/// Send in a background task. Delivery failures are logged and never reach
/// the request that triggered them.
pub fn dispatch(sender: Arc<dyn EmailSender>, kind: AccountEmail, to: String, code: String) {
    tokio::spawn(async move {
        let result = match kind {
            AccountEmail::Confirmation => sender.send_confirmation_email(&to, &code).await,
            AccountEmail::PasswordRecovery => {
                sender.send_password_recovery_email(&to, &code).await
            }
        };

        if let Err(e) = result {
            tracing::warn!(kind = ?kind, to = %to, error = %e, "Failed to send account email");
        }
    });
}

/// Link the user follows to confirm registration
pub fn confirmation_link(frontend_url: &str, code: &str) -> String {
    format!("{}/confirm-email?code={}", frontend_url.trim_end_matches('/'), code)
}

pub fn recovery_link(frontend_url: &str, code: &str) -> String {
    format!(
        "{}/password-recovery?recoveryCode={}",
        frontend_url.trim_end_matches('/'),
        code
    )
}

pub struct SmtpEmailSender {
    config: EmailConfig,
    smtp_host: String,
}

impl SmtpEmailSender {
    /// `None` when no SMTP host is configured
    pub fn from_config(config: &EmailConfig) -> Option<Self> {
        let smtp_host = config.smtp_host.clone()?;
        Some(Self {
            config: config.clone(),
            smtp_host,
        })
    }

    async fn send_html(&self, to: &str, subject: &str, body: String) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder = transport_builder
                .credentials(Credentials::new(user.clone(), pass.expose_secret().clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(subject = subject, "Account email sent");
        Ok(())
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send_confirmation_email(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let link = confirmation_link(&self.config.frontend_url, code);
        let body = format!(
            "<h1>Thank you for your registration</h1>\
             <p>To finish registration please follow the link below:\
             <a href=\"{link}\">complete registration</a></p>"
        );
        self.send_html(to, "Confirm your registration", body).await
    }

    async fn send_password_recovery_email(&self, to: &str, code: &str) -> Result<(), EmailError> {
        let link = recovery_link(&self.config.frontend_url, code);
        let body = format!(
            "<h1>Password recovery</h1>\
             <p>To finish password recovery please follow the link below:\
             <a href=\"{link}\">recovery password</a></p>"
        );
        self.send_html(to, "Password recovery", body).await
    }
}

/// Sender used when SMTP is not configured
#[derive(Debug, Default)]
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send_confirmation_email(&self, _to: &str, _code: &str) -> Result<(), EmailError> {
        tracing::info!(kind = "confirmation", "SMTP not configured, email skipped");
        Ok(())
    }

    async fn send_password_recovery_email(&self, _to: &str, _code: &str) -> Result<(), EmailError> {
        tracing::info!(kind = "password_recovery", "SMTP not configured, email skipped");
        Ok(())
    }
}
