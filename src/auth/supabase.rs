use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::{AuthProvider, Session, UserDirectory};
use crate::config::AuthConfig;
use crate::{AppError, Result};

#[derive(Debug, Deserialize)]
struct AdminUser {
    email: Option<String>,
}

/// Client for a Supabase-compatible auth server.
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseAuth {
    pub fn new(config: &AuthConfig, request_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        })
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Session> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.service_role_key)
            .json(&json!({
                "auth_code": code,
                "code_verifier": code_verifier.unwrap_or_default(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Auth code exchange rejected");
            return Err(AppError::Auth(format!("code exchange failed with {}", status)));
        }

        let session: Session = response.json().await?;
        debug!("Auth code exchanged for session");
        Ok(session)
    }
}

#[async_trait]
impl UserDirectory for SupabaseAuth {
    async fn user_email(&self, user_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/auth/v1/admin/users/{}", self.base_url, user_id))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let user: AdminUser = response.json().await?;
                Ok(user.email.filter(|email| !email.is_empty()))
            }
            status => Err(AppError::Auth(format!("user lookup failed with {}", status))),
        }
    }
}
