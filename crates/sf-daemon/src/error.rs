//! HTTP boundary for failures.
//!
//! Handlers return `Result<_, ApiError>` and use `?` on anything that yields
//! `anyhow::Error`. Domain failures travel as [`ShopError`] inside the anyhow
//! chain and are recovered here; everything else is a 500 whose details stay
//! in the log.

use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sf_core::ShopError;

use crate::api_types::ErrorResponse;

#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Status code and machine-readable kind for a domain failure.
pub fn classify(err: &ShopError) -> (StatusCode, &'static str) {
    match err {
        ShopError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        ShopError::EmptyCart => (StatusCode::CONFLICT, "empty_cart"),
        ShopError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "invalid_status"),
        ShopError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
        ShopError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        ShopError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        ShopError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        ShopError::InsufficientStock { .. } => (StatusCode::CONFLICT, "insufficient_stock"),
        ShopError::ProductInUse(_) => (StatusCode::CONFLICT, "product_in_use"),
    }
}

/// Status and message for a request the extractors could not parse.
fn rejection(err: &anyhow::Error) -> Option<(StatusCode, String)> {
    if let Some(r) = err.downcast_ref::<FormRejection>() {
        return Some((r.status(), r.body_text()));
    }
    if let Some(r) = err.downcast_ref::<JsonRejection>() {
        return Some((r.status(), r.body_text()));
    }
    if let Some(r) = err.downcast_ref::<PathRejection>() {
        return Some((r.status(), r.body_text()));
    }
    if let Some(r) = err.downcast_ref::<QueryRejection>() {
        return Some((r.status(), r.body_text()));
    }
    None
}

fn rejection_kind(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        StatusCode::UNPROCESSABLE_ENTITY => "validation",
        _ => "bad_request",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some((status, error)) = rejection(&self.0) {
            let kind = rejection_kind(status);
            tracing::info!(kind, error = %error, "request rejected");
            let body = ErrorResponse {
                success: false,
                error,
                kind,
            };
            return (status, Json(body)).into_response();
        }

        let (status, body) = match self.0.downcast_ref::<ShopError>() {
            Some(domain) => {
                let (status, kind) = classify(domain);
                tracing::info!(kind, error = %domain, "request refused");
                (
                    status,
                    ErrorResponse {
                        success: false,
                        error: domain.to_string(),
                        kind,
                    },
                )
            }
            None => {
                tracing::error!(error = ?self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        success: false,
                        error: "internal error".to_string(),
                        kind: "internal",
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
