use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cron: CronConfig,
    pub scraper: ScraperConfig,
    pub notifications: NotificationsConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

/// Hosted auth provider (Supabase-compatible) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub url: String,
    pub service_role_key: String,
    pub jwt_secret: String,
    pub jwt_audience: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Resend,
    Smtp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub provider: EmailProvider,
    pub from_address: String,
    pub resend: ResendConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Seconds before an email API call is abandoned
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

/// In-process trigger for the batch price check. Off by default; the usual
/// trigger is an external scheduler calling the cron endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub cron: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.base_url", "http://localhost:3000")?
            .set_default("server.request_timeout", 30)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("auth.url", "")?
            .set_default("auth.service_role_key", "")?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.jwt_audience", "authenticated")?
            .set_default("cron.secret", "")?
            .set_default("scraper.api_key", "")?
            .set_default("scraper.base_url", "https://api.firecrawl.dev")?
            .set_default("scraper.request_timeout", 60)?
            .set_default("notifications.provider", "resend")?
            .set_default("notifications.from_address", "")?
            .set_default("notifications.resend.base_url", "https://api.resend.com")?
            .set_default("notifications.resend.request_timeout", 30)?
            .set_default("notifications.smtp.port", 587)?
            .set_default("notifications.smtp.use_tls", true)?
            .set_default("scheduler.enabled", false)?
            .set_default("scheduler.cron", "0 0 */6 * * *")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PRICEDROP").separator("__"))
            // Conventional names used by the hosting platform
            .set_override_option("cron.secret", env::var("CRON_SECRET").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("scraper.api_key", env::var("FIRECRAWL_API_KEY").ok())?
            .set_override_option("notifications.resend.api_key", env::var("RESEND_API_KEY").ok())?
            .set_override_option("notifications.from_address", env::var("RESEND_FROM_EMAIL").ok())?
            .set_override_option("auth.url", env::var("SUPABASE_URL").ok())?
            .set_override_option("auth.service_role_key", env::var("SUPABASE_SERVICE_ROLE_KEY").ok())?
            .set_override_option("auth.jwt_secret", env::var("SUPABASE_JWT_SECRET").ok())?
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        if Url::parse(&self.server.base_url).is_err() {
            return Err(ConfigError::Message("Invalid base URL format".into()));
        }

        require("database.url (DATABASE_URL)", &self.database.url)?;
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "Database min_connections cannot exceed max_connections".into(),
            ));
        }

        require("cron.secret (CRON_SECRET)", &self.cron.secret)?;

        require("auth.url (SUPABASE_URL)", &self.auth.url)?;
        if Url::parse(&self.auth.url).is_err() {
            return Err(ConfigError::Message("Invalid auth.url format".into()));
        }
        require("auth.service_role_key (SUPABASE_SERVICE_ROLE_KEY)", &self.auth.service_role_key)?;
        require("auth.jwt_secret (SUPABASE_JWT_SECRET)", &self.auth.jwt_secret)?;

        require("scraper.api_key (FIRECRAWL_API_KEY)", &self.scraper.api_key)?;
        if Url::parse(&self.scraper.base_url).is_err() {
            return Err(ConfigError::Message("Invalid scraper.base_url format".into()));
        }

        require(
            "notifications.from_address (RESEND_FROM_EMAIL)",
            &self.notifications.from_address,
        )?;
        match self.notifications.provider {
            EmailProvider::Resend => {
                let key = self.notifications.resend.api_key.as_deref().unwrap_or_default();
                require("notifications.resend.api_key (RESEND_API_KEY)", key)?;
            }
            EmailProvider::Smtp => {
                let host = self.notifications.smtp.host.as_deref().unwrap_or_default();
                require("notifications.smtp.host", host)?;
                if self.notifications.smtp.port == 0 {
                    return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
                }
            }
        }

        if self.scheduler.enabled && !self.is_valid_cron(&self.scheduler.cron) {
            return Err(ConfigError::Message("Invalid cron expression in scheduler.cron".into()));
        }

        Ok(())
    }

    fn is_valid_cron(&self, cron_expr: &str) -> bool {
        // sec min hour day month weekday [year]
        let parts: Vec<&str> = cron_expr.split_whitespace().collect();
        if parts.len() != 6 && parts.len() != 7 {
            return false;
        }

        parts.iter().all(|part| {
            part.chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '*' | '-' | ',' | '/' | '?'))
        })
    }
}

fn require(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Message(format!("Missing required setting: {}", name)));
    }
    Ok(())
}
