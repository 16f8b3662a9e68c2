//! Session start and Webex login endpoints.
//!
//! - `GET /` and `GET /bulk` start a session and set its cookie
//! - `GET|POST /webexlogin` redirects to the Webex authorize page
//! - `GET /webexoauth` completes the authorization-code exchange

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{require_session, session_cookie, session_id};
use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::migration::steps::{self, SchedulerView};
use crate::migration::WorkflowMode;
use crate::webex::oauth;

const LOGIN_PATH: &str = "/webexlogin";

#[derive(Debug, Deserialize, Default)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Webex when the user declined the integration
    pub error: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(start_interactive))
        .route("/bulk", get(start_bulk))
        .route(LOGIN_PATH, get(webex_login).post(webex_login))
        .route("/webexoauth", get(webex_oauth))
        .with_state(state)
}

async fn start_interactive(State(state): State<ApiState>) -> ApiResult<Response> {
    start_session(&state, WorkflowMode::Interactive).await
}

async fn start_bulk(State(state): State<ApiState>) -> ApiResult<Response> {
    start_session(&state, WorkflowMode::Bulk).await
}

async fn start_session(state: &ApiState, mode: WorkflowMode) -> ApiResult<Response> {
    let (id, context) = state.sessions.create(mode).await;
    info!("Started {} session", mode.as_str());

    let view = {
        let context = context.lock().await;
        steps::login_view(&state.migrator, &context, LOGIN_PATH)
    };
    let cookie = session_cookie(&id, state.sessions.ttl().num_seconds())?;
    Ok(([(header::SET_COOKIE, cookie)], Json(view)).into_response())
}

/// Redirects to the Webex authorize page. A caller without a session gets
/// a fresh interactive one.
async fn webex_login(State(state): State<ApiState>, headers: HeaderMap) -> ApiResult<Response> {
    let existing = match session_id(&headers) {
        Some(id) => state.sessions.get(&id).await,
        None => None,
    };
    let (new_id, handle) = match existing {
        Some(handle) => (None, handle),
        None => {
            let (id, handle) = state.sessions.create(WorkflowMode::Interactive).await;
            (Some(id), handle)
        }
    };

    let oauth_state = Uuid::new_v4().to_string();
    handle.lock().await.oauth_state = Some(oauth_state.clone());

    let url = oauth::authorize_url(&state.webex, Some(&oauth_state))
        .map_err(|e| ApiError::internal(format!("Invalid Webex base URL: {e}")))?;
    let redirect = Redirect::to(url.as_str());

    match new_id {
        Some(id) => {
            let cookie = session_cookie(&id, state.sessions.ttl().num_seconds())?;
            Ok(([(header::SET_COOKIE, cookie)], redirect).into_response())
        }
        None => Ok(redirect.into_response()),
    }
}

async fn webex_oauth(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(params): Query<OAuthCallback>,
) -> ApiResult<Json<SchedulerView>> {
    if let Some(error) = params.error.as_deref() {
        warn!("Webex authorization was refused: {}", error);
        return Err(ApiError::unauthorized(format!(
            "Webex authorization failed: {error}"
        )));
    }
    let code = params
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let handle = require_session(&state, &headers).await?;
    let mut context = handle.lock().await;
    let view =
        steps::complete_login(&state.migrator, &mut context, code, params.state.as_deref())
            .await?;
    Ok(Json(view))
}
