use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};

use super::middleware::{bearer_token, constant_time_eq};
use super::{ApiError, AppState};
use crate::auth::AuthenticatedUser;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";

/// Session from the bearer header, falling back to the access-token cookie.
#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .map(str::to_string)
            .or_else(|| read_cookie(&parts.headers, ACCESS_TOKEN_COOKIE))
            .ok_or_else(ApiError::not_authenticated)?;

        state.sessions.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            ApiError::not_authenticated()
        })
    }
}

/// Present on requests that carry the configured cron secret as a bearer token.
#[derive(Debug, Clone, Copy)]
pub struct CronAuthorized;

#[async_trait]
impl FromRequestParts<AppState> for CronAuthorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state.config.cron.secret.as_bytes();
        match bearer_token(&parts.headers) {
            Some(token) if constant_time_eq(token.as_bytes(), expected) => Ok(CronAuthorized),
            _ => {
                tracing::warn!("Rejected price check trigger with missing or wrong secret");
                Err(ApiError::unauthorized())
            }
        }
    }
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", name, value, max_age);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

/// Only same-site absolute paths are followed after login; anything else,
/// including protocol-relative `//host` targets and paths that cannot be sent
/// as a `Location` header, goes home.
pub fn safe_redirect_target(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && HeaderValue::from_str(path).is_ok() =>
        {
            path
        }
        _ => "/",
    }
}
