//! REST API server for the recording migrator.
//!
//! Provides HTTP endpoints for:
//! - Starting an interactive or bulk session
//! - Webex login (authorize redirect and OAuth callback)
//! - Period, site and person selection
//! - Recording selection, transfer and the result summary
//! - Service and session status

pub mod error;
pub mod routes;

use crate::config::{ServerConfig, WebexConfig};
use crate::migration::Migrator;
use crate::session::SessionStore;
use anyhow::Result;
use axum::{extract::State, http::HeaderMap, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct ApiState {
    pub migrator: Arc<Migrator>,
    pub sessions: SessionStore,
    pub webex: WebexConfig,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(status))
        .with_state(state.clone())
        .merge(routes::login::router(state.clone()))
        .merge(routes::migration::router(state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

pub struct ApiServer {
    bind: String,
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(config: &ServerConfig, state: ApiState) -> Self {
        Self {
            bind: config.bind.clone(),
            port: config.port,
            state,
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = build_router(self.state);
        let listener = tokio::net::TcpListener::bind(&format!("{}:{}", self.bind, self.port)).await?;

        info!("API server listening on http://{}:{}", self.bind, self.port);
        info!("Endpoints:");
        info!("  GET  /                  - Start an interactive session");
        info!("  GET  /bulk              - Start a bulk session");
        info!("  GET  /webexlogin        - Redirect to Webex login");
        info!("  GET  /webexoauth        - OAuth callback");
        info!("  GET  /scheduler         - Sites and people to choose from");
        info!("  POST /select_period     - Enumerate (and in bulk mode transfer) recordings");
        info!("  POST /select_recordings - Transfer selected recordings");
        info!("  GET  /status            - Service and session status");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Service info, plus the caller's session when it carries one.
async fn status(State(state): State<ApiState>, headers: HeaderMap) -> Json<Value> {
    let session = match routes::session_id(&headers) {
        Some(id) => state.sessions.get(&id).await,
        None => None,
    };

    let session = match session {
        Some(handle) => match handle.try_lock() {
            Ok(context) => json!({
                "mode": context.mode.as_str(),
                "phase": context.phase.as_str(),
                "authenticated": context.is_authenticated(),
                "busy": false,
                "recordings": context.recordings.len(),
                "last_summary": context.last_summary,
            }),
            // a step of this session is still running
            Err(_) => json!({ "busy": true }),
        },
        None => Value::Null,
    };

    Json(json!({
        "service": "recording-migrator",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "action": state.migrator.policy().action_label(),
        "destination": state.migrator.destination(),
        "storage_link": state.migrator.store().location_link(),
        "active_sessions": state.sessions.len().await,
        "session": session,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::fakes::{FakeProvider, MemoryStore};
    use crate::migration::TransferPolicy;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn state() -> ApiState {
        ApiState {
            migrator: Arc::new(Migrator::new(
                Arc::new(FakeProvider::default()),
                Arc::new(MemoryStore::default()),
                TransferPolicy::Migrate,
            )),
            sessions: SessionStore::with_ttl_minutes(60),
            webex: WebexConfig::default(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_without_session() {
        let app = build_router(state());
        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], "recording-migrator");
        assert_eq!(json["action"], "Migrate");
        assert_eq!(json["destination"], "Local");
        assert!(json["session"].is_null());
    }

    #[tokio::test]
    async fn test_status_reports_session_phase() {
        let state = state();
        let (id, _) = state
            .sessions
            .create(crate::migration::WorkflowMode::Bulk)
            .await;
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::get("/status")
                    .header(header::COOKIE, format!("rm_session={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["session"]["mode"], "bulk");
        assert_eq!(json["session"]["phase"], "login");
        assert_eq!(json["session"]["authenticated"], false);
    }
}
