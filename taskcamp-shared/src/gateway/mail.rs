/// Mail gateway
///
/// Outbound email for the verification and password reset flows. Handlers
/// build messages with the helpers here and hand them to a
/// [`MailGateway`]; delivery failures are logged but never fail the
/// request, so a down mail server cannot block registration.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use super::GatewayError;

/// An outbound email
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Plain-text body
    pub body: String,

    /// HTML body, when the backend supports multipart delivery
    pub html_body: Option<String>,
}

/// Trait for mail backends
#[async_trait]
pub trait MailGateway: Send + Sync {
    /// Sends a single message
    async fn send(&self, message: EmailMessage) -> Result<(), GatewayError>;
}

/// Builds the email-verification message
///
/// The link embeds the plaintext token; only its digest is stored
/// server-side.
pub fn verification_email(to: &str, base_url: &str, token: &str) -> EmailMessage {
    let link = format!("{base_url}/v1/auth/verify-email/{token}");
    EmailMessage {
        to: to.to_string(),
        subject: "Verify your Taskcamp email".to_string(),
        body: format!(
            "Welcome to Taskcamp!\n\n\
             Confirm your email address by opening the link below within 20 minutes:\n\n\
             {link}\n\n\
             If you didn't create an account, you can ignore this email."
        ),
        html_body: Some(format!(
            "<p>Welcome to Taskcamp!</p>\
             <p>Confirm your email address within 20 minutes:</p>\
             <p><a href=\"{link}\">Verify email</a></p>\
             <p>If you didn't create an account, you can ignore this email.</p>"
        )),
    }
}

/// Builds the password-reset message
pub fn password_reset_email(to: &str, base_url: &str, token: &str) -> EmailMessage {
    let link = format!("{base_url}/reset-password/{token}");
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your Taskcamp password".to_string(),
        body: format!(
            "A password reset was requested for your Taskcamp account.\n\n\
             Open the link below within 20 minutes to choose a new password:\n\n\
             {link}\n\n\
             If you didn't request this, you can ignore this email."
        ),
        html_body: Some(format!(
            "<p>A password reset was requested for your Taskcamp account.</p>\
             <p>Open the link below within 20 minutes to choose a new password:</p>\
             <p><a href=\"{link}\">Reset password</a></p>\
             <p>If you didn't request this, you can ignore this email.</p>"
        )),
    }
}

/// Mail backend that logs instead of delivering
///
/// Used in development so the verification and reset links show up in the
/// server logs.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl MailGateway for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), GatewayError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Outbound email (log mailer)"
        );
        Ok(())
    }
}

/// Recording mail backend for tests
///
/// Stores every message so assertions can inspect recipients and extract
/// tokens from bodies.
#[derive(Debug, Default)]
pub struct MockMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MockMailer {
    /// Creates an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far
    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// The most recent message, if any
    pub fn last_message(&self) -> Option<EmailMessage> {
        self.sent.lock().ok().and_then(|s| s.last().cloned())
    }
}

#[async_trait]
impl MailGateway for MockMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), GatewayError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}
