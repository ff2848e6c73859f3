use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error};

use super::{Notifier, NotifyError, ResetEmail};
use crate::config::SmtpConfig;

/// Sends reset emails through an authenticated SMTP relay (STARTTLS).
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpNotifier {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();
        Ok(Self {
            mailer,
            from: cfg.from.clone(),
        })
    }

    fn build_message(&self, email: &ResetEmail) -> Result<Message, NotifyError> {
        Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("from: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| NotifyError::Address(format!("to: {e}")))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| NotifyError::Transport(format!("build message: {e}")))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: &ResetEmail) -> Result<(), NotifyError> {
        let message = self.build_message(email)?;
        self.mailer.send(message).await.map_err(|e| {
            error!(error = %e, to = %email.to, "smtp send failed");
            NotifyError::Transport(e.to_string())
        })?;
        debug!(to = %email.to, "reset email sent");
        Ok(())
    }
}
