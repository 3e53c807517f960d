use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde::Deserialize;

use super::session::{
    expired_cookie, read_cookie, safe_redirect_target, session_cookie, CronAuthorized,
    ACCESS_TOKEN_COOKIE, CODE_VERIFIER_COOKIE, REFRESH_TOKEN_COOKIE,
};
use super::{
    AddProductResponse, ApiError, AppState, CheckPricesResponse, HealthResponse, MessageResponse,
    SuccessResponse,
};
use crate::auth::AuthenticatedUser;
use crate::models::{PriceObservation, Product};
use crate::product_manager::AddProductRequest;

const DEFAULT_SESSION_SECONDS: i64 = 3600;
const REFRESH_TOKEN_SECONDS: i64 = 60 * 60 * 24 * 30;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// Product handlers

pub async fn list_products(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.product_manager.list_products(&user.id).await?;
    Ok(Json(products))
}

pub async fn add_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    body: Result<Json<AddProductRequest>, JsonRejection>,
) -> Result<Json<AddProductResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable add-product body");
        ApiError::bad_request("Invalid request body")
    })?;
    tracing::info!(user_id = %user.id, url = %request.url, "Adding product");

    let outcome = state.product_manager.add_product(&user.id, request).await?;
    Ok(Json(AddProductResponse::from(outcome)))
}

pub async fn delete_product(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if state.product_manager.delete_product(&user.id, &product_id).await? {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(ApiError::not_found("Product"))
    }
}

pub async fn product_history(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<PriceObservation>>, ApiError> {
    let history = state.product_manager.price_history(&user.id, &product_id).await?;
    Ok(Json(history))
}

// Batch price check handlers

pub async fn check_prices(
    _authorized: CronAuthorized,
    State(state): State<AppState>,
) -> Result<Json<CheckPricesResponse>, ApiError> {
    tracing::info!("Price check triggered over HTTP");

    match state.price_checker.run().await {
        Ok(report) => Ok(Json(CheckPricesResponse::from(report))),
        Err(e) => {
            tracing::error!(error = %e, "Price check run failed");
            Err(ApiError::internal("Failed to check prices"))
        }
    }
}

pub async fn check_prices_status() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Price check endpoint is working. Use POST to trigger.".to_string(),
    })
}

// Auth handlers

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}

pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!("Auth callback without code");
        return see_other("/error", HeaderMap::new()).unwrap_or_else(IntoResponse::into_response);
    };

    let verifier = read_cookie(&headers, CODE_VERIFIER_COOKIE);
    let session = match state.auth.exchange_code(&code, verifier.as_deref()).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Auth code exchange failed");
            return see_other("/error", HeaderMap::new()).unwrap_or_else(IntoResponse::into_response);
        }
    };

    let secure = state.config.server.base_url.starts_with("https://");
    let max_age = session.expires_in.unwrap_or(DEFAULT_SESSION_SECONDS);

    let mut cookies = vec![
        session_cookie(ACCESS_TOKEN_COOKIE, &session.access_token, max_age, secure),
        expired_cookie(CODE_VERIFIER_COOKIE),
    ];
    if let Some(refresh) = &session.refresh_token {
        cookies.push(session_cookie(REFRESH_TOKEN_COOKIE, refresh, REFRESH_TOKEN_SECONDS, secure));
    }

    let target = safe_redirect_target(params.next.as_deref());
    tracing::info!(target = %target, "Signed in");

    set_cookies(cookies)
        .and_then(|headers| see_other(target, headers))
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn sign_out() -> Response {
    let cookies = vec![
        expired_cookie(ACCESS_TOKEN_COOKIE),
        expired_cookie(REFRESH_TOKEN_COOKIE),
    ];

    set_cookies(cookies)
        .and_then(|headers| see_other("/", headers))
        .unwrap_or_else(IntoResponse::into_response)
}

pub async fn error_page() -> Html<&'static str> {
    Html(r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed</title><meta charset="utf-8"></head>
<body style="font-family: system-ui, sans-serif; text-align: center; margin-top: 80px;">
    <h1>Something went wrong</h1>
    <p>We couldn't sign you in. Please try again.</p>
    <p><a href="/">Back to home</a></p>
</body>
</html>"#)
}

fn set_cookies(cookies: Vec<String>) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie).map_err(|e| {
            tracing::error!(error = %e, "Session cookie is not a valid header value");
            ApiError::internal("Failed to set session")
        })?;
        headers.append(header::SET_COOKIE, value);
    }
    Ok(headers)
}

fn see_other(location: &str, mut headers: HeaderMap) -> Result<Response, ApiError> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| ApiError::bad_request("Invalid redirect target"))?;
    headers.insert(header::LOCATION, location);
    Ok((StatusCode::SEE_OTHER, headers).into_response())
}
