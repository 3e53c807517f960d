use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResendConfig;
use crate::plugins::traits::{NotificationResult, Notifier, PriceDropAlert};
use crate::{AppError, Result};

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    html: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Sends alerts through the Resend HTTP email API.
pub struct ResendNotifier {
    client: Client,
    api_key: String,
    base_url: String,
    from_address: String,
}

impl ResendNotifier {
    pub fn new(config: &ResendConfig, from_address: &str) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Email("Resend API key is not configured".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            from_address: from_address.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send_price_drop(&self, to: &str, alert: &PriceDropAlert) -> Result<NotificationResult> {
        let payload = SendEmailRequest {
            from: &self.from_address,
            to: vec![to],
            subject: alert.subject(),
            html: alert.html_body(),
            text: alert.text_body(),
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(to = %to, status = %status, "Email API rejected price drop alert");
            return Ok(NotificationResult::failed(format!("{}: {}", status, body)));
        }

        let sent: SendEmailResponse = response.json().await?;
        debug!(to = %to, message_id = ?sent.id, "Price drop email sent");
        Ok(NotificationResult::sent(sent.id))
    }
}
