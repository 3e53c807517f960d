use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

pub mod supabase;

pub use supabase::SupabaseAuth;

/// Claims carried by the auth provider's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub aud: Option<String>,
}

/// The caller behind a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

/// Tokens returned by a successful OAuth code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Checks HS256 session tokens signed with the provider's JWT secret.
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(AppError::Auth("token has no subject".to_string()));
        }

        Ok(AuthenticatedUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// OAuth code exchange against the hosted auth provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Session>;
}

/// Read-only access to the provider's user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(None)` when the user does not exist or has no email on file.
    async fn user_email(&self, user_id: &str) -> Result<Option<String>>;
}
