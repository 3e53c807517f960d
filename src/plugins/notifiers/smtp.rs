use async_trait::async_trait;
use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use crate::config::SmtpConfig;
use crate::plugins::traits::{NotificationResult, Notifier, PriceDropAlert};
use crate::{AppError, Result};

/// Sends alerts through a plain SMTP relay.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, from_address: &str) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| AppError::Email("SMTP host is not configured".to_string()))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            mailer: builder.build(),
            from: from_address.parse()?,
        })
    }

    fn build_message(&self, to: &str, alert: &PriceDropAlert) -> Result<Message> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(alert.subject())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(alert.text_body()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(alert.html_body()),
                    ),
            )?;
        Ok(message)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send_price_drop(&self, to: &str, alert: &PriceDropAlert) -> Result<NotificationResult> {
        let message = self.build_message(to, alert)?;

        match self.mailer.send(message).await {
            Ok(response) => {
                let message_id = response.message().next().map(str::to_string);
                debug!(to = %to, "Price drop email accepted by SMTP relay");
                Ok(NotificationResult::sent(message_id))
            }
            Err(e) => {
                warn!(to = %to, error = %e, "SMTP relay rejected price drop email");
                Ok(NotificationResult::failed(e.to_string()))
            }
        }
    }
}
