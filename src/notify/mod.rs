use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

mod smtp;

pub use smtp::SmtpNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("{0}")]
    Transport(String),
}

/// Password-reset message handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub link: String,
}

impl ResetEmail {
    pub fn new(to: &str, link: String) -> Self {
        let body = format!(
            "You are receiving this because you (or someone else) have requested the reset \
             of the password for your account.\n\n\
             Please click on the following link, or paste this into your browser to complete \
             the process:\n\n\
             {link}\n\n\
             If you did not request this, please ignore this email.\n"
        );
        Self {
            to: to.to_string(),
            subject: "Password Reset Request".to_string(),
            body,
            link,
        }
    }
}

/// Out-of-band delivery of reset links.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &ResetEmail) -> Result<(), NotifyError>;
}

/// Used when SMTP is not configured. Nothing leaves the process.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: &ResetEmail) -> Result<(), NotifyError> {
        warn!(to = %email.to, "smtp not configured; reset email dropped");
        Ok(())
    }
}

#[cfg(test)]
pub use recording::RecordingNotifier;
