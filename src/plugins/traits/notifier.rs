use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::Result;

/// Everything a price-drop email needs to say.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceDropAlert {
    pub product_name: String,
    pub product_url: String,
    pub image_url: Option<String>,
    pub currency: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn sent(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Delivers price-drop alerts (email API, SMTP, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_price_drop(&self, to: &str, alert: &PriceDropAlert) -> Result<NotificationResult>;
}

impl PriceDropAlert {
    pub fn for_product(product: &Product, currency: &str, old_price: Decimal, new_price: Decimal) -> Self {
        Self {
            product_name: product.name.clone(),
            product_url: product.url.clone(),
            image_url: product.image_url.clone(),
            currency: currency.to_string(),
            old_price,
            new_price,
        }
    }

    pub fn savings(&self) -> Decimal {
        self.old_price - self.new_price
    }

    /// Drop as a percentage of the old price, one decimal place.
    pub fn percentage_drop(&self) -> Decimal {
        if self.old_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.savings() / self.old_price * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    }

    pub fn subject(&self) -> String {
        format!("🎉 Price Drop Alert: {}", self.product_name)
    }

    pub fn html_body(&self) -> String {
        let name = escape_html(&self.product_name);
        let mut html = String::new();

        html.push_str(r#"<!DOCTYPE html>
<html>
<body style="font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: auto; padding: 20px;">
  <div style="background: linear-gradient(135deg, #FA5D19, #FF8C42); padding: 30px; border-radius: 10px 10px 0 0; text-align: center;">
    <h1 style="color: white; margin: 0;">🎉 Price Drop Alert!</h1>
  </div>
  <div style="background: white; padding: 30px; border: 1px solid #e5e7eb; border-top: none; border-radius: 0 0 10px 10px;">
"#);

        if let Some(image_url) = &self.image_url {
            html.push_str(&format!(
                r#"    <div style="text-align:center;margin-bottom:20px">
      <img src="{}" alt="{}" style="max-width:200px;border-radius:8px;border:1px solid #e5e7eb" />
    </div>
"#,
                escape_html(image_url),
                name
            ));
        }

        html.push_str(&format!(
            r#"    <h2 style="margin-top:0">{name}</h2>
    <p style="background:#fef3c7;padding:12px;border-left:4px solid #f59e0b">
      <strong>Price dropped by {pct}%</strong>
    </p>
    <table style="width:100%;margin:20px 0">
      <tr><td style="padding:10px;color:#9ca3af;text-decoration:line-through">{cur} {old:.2}</td></tr>
      <tr><td style="padding:10px;font-size:28px;color:#FA5D19;font-weight:bold">{cur} {new:.2}</td></tr>
      <tr><td style="padding:10px;color:#16a34a;font-weight:bold">You save {cur} {save:.2}</td></tr>
    </table>
    <div style="text-align:center;margin-top:30px">
      <a href="{url}" style="background:#FA5D19;color:white;padding:14px 30px;border-radius:6px;text-decoration:none;font-weight:600">View Product →</a>
    </div>
    <p style="font-size:12px;color:#6b7280;text-align:center;margin-top:30px">
      You are receiving this because you're tracking this product.
    </p>
  </div>
</body>
</html>
"#,
            name = name,
            pct = self.percentage_drop(),
            cur = escape_html(&self.currency),
            old = self.old_price,
            new = self.new_price,
            save = self.savings(),
            url = escape_html(&self.product_url),
        ));

        html
    }

    pub fn text_body(&self) -> String {
        let mut text = String::new();

        text.push_str("PRICE DROP ALERT\n\n");
        text.push_str(&format!("Product: {}\n", self.product_name));
        text.push_str(&format!("Price dropped by {}%\n", self.percentage_drop()));
        text.push_str(&format!(
            "Was: {} {:.2}\nNow: {} {:.2}\nYou save: {} {:.2}\n\n",
            self.currency, self.old_price, self.currency, self.new_price, self.currency, self.savings()
        ));
        text.push_str(&format!("View product: {}\n", self.product_url));

        text
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
