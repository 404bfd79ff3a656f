//! Request identity as reported by the upstream auth proxy.
//!
//! `x-user-id` carries the authenticated user, `x-user-staff` (`true` or `1`)
//! marks staff. Anonymous browsers carry the session cookie. Nothing here
//! touches storage.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use sf_core::ShopError;
use sf_schemas::Identity;

use crate::{error::ApiError, state::AppState};

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_STAFF: &str = "x-user-staff";

/// Extractor wrapping the caller's [`Identity`].
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, st: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        Ok(Caller(identity_from_headers(&parts.headers, st.session_cookie())?))
    }
}

/// A malformed user header is refused outright rather than downgraded to an
/// anonymous request.
pub fn identity_from_headers(headers: &HeaderMap, cookie_name: &str) -> Result<Identity, ShopError> {
    let user_id = match headers.get(HEADER_USER_ID) {
        None => None,
        Some(v) => {
            let raw = v.to_str().map_err(|_| ShopError::Unauthorized)?.trim();
            if raw.is_empty() {
                None
            } else {
                Some(raw.parse::<i64>().map_err(|_| ShopError::Unauthorized)?)
            }
        }
    };
    let is_staff = user_id.is_some()
        && headers
            .get(HEADER_USER_STAFF)
            .and_then(|v| v.to_str().ok())
            .map(|v| matches!(v.trim(), "true" | "1"))
            .unwrap_or(false);

    Ok(Identity {
        user_id,
        is_staff,
        session_key: session_from_cookies(headers, cookie_name),
    })
}

fn session_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == cookie_name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn mint_session_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// `Set-Cookie` value handing a freshly minted session back to the browser.
pub fn session_cookie_header(cookie_name: &str, key: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{cookie_name}={key}; Path=/; HttpOnly; SameSite=Lax")).ok()
}
