use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::price_check::{CheckSummary, PriceCheckReport};
use crate::product_manager::AddProductOutcome;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors as the HTTP client sees them: a status and `{ "error": message }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    UnprocessableEntity(String),
    InternalServerError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::UnprocessableEntity(msg)
            | ApiError::InternalServerError(msg) => msg,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_authenticated() -> Self {
        Self::Unauthorized("Not authenticated".to_string())
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".to_string())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(format!("{} not found", resource.into()))
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::UnprocessableEntity(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalServerError(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<crate::AppError> for ApiError {
    fn from(err: crate::AppError) -> Self {
        use crate::AppError;

        match err {
            AppError::Validation(msg) => ApiError::bad_request(msg),
            AppError::Extraction(msg) => ApiError::unprocessable(msg),
            AppError::Auth(_) => ApiError::not_authenticated(),
            AppError::NotFound { resource } => ApiError::not_found(resource),
            other => {
                tracing::error!(error = %other, "Request failed");
                ApiError::internal("Internal server error")
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddProductResponse {
    pub success: bool,
    pub product: Product,
    pub message: String,
}

impl From<AddProductOutcome> for AddProductResponse {
    fn from(outcome: AddProductOutcome) -> Self {
        let message = outcome.message().to_string();
        Self {
            success: true,
            product: outcome.product,
            message,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckPricesResponse {
    pub success: bool,
    pub message: String,
    pub results: CheckSummary,
}

impl From<PriceCheckReport> for CheckPricesResponse {
    fn from(report: PriceCheckReport) -> Self {
        Self {
            success: true,
            message: report.message,
            results: report.results,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub service: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}
