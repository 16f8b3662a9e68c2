//! API route modules.

pub mod login;
pub mod migration;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::session::{SessionHandle, SESSION_COOKIE};

/// Session id carried in the request's cookie header, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value binding the browser to a session.
pub fn session_cookie(id: &str, max_age_secs: i64) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    ))
    .map_err(|e| ApiError::internal(format!("Invalid session cookie: {e}")))
}

/// Looks up the caller's live session.
pub async fn require_session(state: &ApiState, headers: &HeaderMap) -> ApiResult<SessionHandle> {
    let id = session_id(headers)
        .ok_or_else(|| ApiError::unauthorized("No session, open / or /bulk to start"))?;
    state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| ApiError::unauthorized("Session expired, open / or /bulk to start again"))
}
