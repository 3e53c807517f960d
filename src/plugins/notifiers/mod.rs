// Notifier implementations
pub mod resend;
pub mod smtp;

pub use resend::ResendNotifier;
pub use smtp::SmtpNotifier;

use std::sync::Arc;

use crate::config::{EmailProvider, NotificationsConfig};
use crate::plugins::traits::Notifier;
use crate::Result;

pub fn build_notifier(config: &NotificationsConfig) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.provider {
        EmailProvider::Resend => Arc::new(ResendNotifier::new(&config.resend, &config.from_address)?),
        EmailProvider::Smtp => Arc::new(SmtpNotifier::new(&config.smtp, &config.from_address)?),
    };
    tracing::info!(provider = notifier.name(), "Email notifier configured");
    Ok(notifier)
}
