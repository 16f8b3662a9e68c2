//! Migration step endpoints.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use super::require_session;
use crate::api::error::ApiResult;
use crate::api::ApiState;
use crate::migration::steps::{self, PeriodSelection, PeriodView, SchedulerView, SummaryView};

/// Request body for `POST /select_recordings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingSelection {
    #[serde(default, alias = "meeting_id")]
    pub recording_ids: Vec<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/scheduler", get(scheduler))
        .route("/select_period", post(select_period))
        .route("/select_recordings", post(select_recordings))
        .with_state(state)
}

/// GET /scheduler - Sites and people for the logged-in session.
async fn scheduler(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<SchedulerView>> {
    let handle = require_session(&state, &headers).await?;
    let mut context = handle.lock().await;
    Ok(Json(steps::scheduler(&state.migrator, &mut context).await?))
}

/// POST /select_period - Lists the period's recordings. Bulk sessions also
/// transfer them and get the summary back.
async fn select_period(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(selection): Json<PeriodSelection>,
) -> ApiResult<Json<PeriodView>> {
    let handle = require_session(&state, &headers).await?;
    let mut context = handle.lock().await;
    Ok(Json(
        steps::select_period(&state.migrator, &mut context, &selection).await?,
    ))
}

/// POST /select_recordings - Transfers the chosen recordings.
async fn select_recordings(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(selection): Json<RecordingSelection>,
) -> ApiResult<Json<SummaryView>> {
    let handle = require_session(&state, &headers).await?;
    let mut context = handle.lock().await;
    Ok(Json(
        steps::select_recordings(&state.migrator, &mut context, &selection.recording_ids)
            .await?,
    ))
}
