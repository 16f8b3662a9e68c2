//! Stub Webex API served by axum on an ephemeral port.
//!
//! Directory:
//! - p1: jane@example.com (Jane Doe), recordings r1 and r2 split over two pages
//! - p2: locked@example.com, whose recording listing answers 401
//! - p3: no email address
//!
//! The authorization code "good" yields a one-hour token. Deleting "r2" fails.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use recording_migrator::config::WebexConfig;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct StubState {
    pub base: String,
    pub deletes: Arc<Mutex<Vec<(String, String)>>>,
}

pub struct StubWebex {
    pub base: String,
    pub state: StubState,
}

impl StubWebex {
    pub fn config(&self) -> WebexConfig {
        WebexConfig {
            base_url: format!("{}/v1", self.base),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://127.0.0.1:5500/webexoauth".to_string(),
            ..Default::default()
        }
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.state.deletes.lock().unwrap().clone()
    }
}

pub async fn spawn_stub() -> StubWebex {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let state = StubState {
        base: base.clone(),
        deletes: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/v1/access_token", post(access_token))
        .route("/v1/meetingPreferences/sites", get(sites))
        .route("/v1/people", get(people))
        .route("/v1/people/:id", get(person))
        .route("/v1/recordings", get(recordings))
        .route(
            "/v1/recordings/:id",
            get(recording_details).delete(delete_recording),
        )
        .route("/download/:id", get(download))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubWebex { base, state }
}

async fn access_token(Form(form): Form<HashMap<String, String>>) -> Response {
    match form.get("code").map(String::as_str) {
        Some("good") if form.get("grant_type").map(String::as_str) == Some("authorization_code") => {
            Json(json!({"access_token": "stub-token", "expires_in": 3600})).into_response()
        }
        Some("tokenless") => Json(json!({"expires_in": 3600})).into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"message": "bad code"}))).into_response(),
    }
}

async fn sites() -> Response {
    Json(json!({"sites": [
        {"siteUrl": "other.webex.com", "default": false},
        {"siteUrl": "acme.webex.com", "default": true}
    ]}))
    .into_response()
}

async fn people(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("cursor").map(String::as_str) == Some("2") {
        return Json(json!({"items": [
            {"id": "p3", "emails": [], "displayName": "No Mail"}
        ]}))
        .into_response();
    }

    let next = format!("<{}/v1/people?max=100&cursor=2>; rel=\"next\"", state.base);
    (
        [(header::LINK, next)],
        Json(json!({"items": [
            {"id": "p1", "emails": ["jane@example.com"], "displayName": "Jane Doe"},
            {"id": "p2", "emails": ["locked@example.com"], "displayName": "Locked Out"}
        ]})),
    )
        .into_response()
}

async fn person(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "p1" => Json(json!({"emails": ["jane@example.com"], "displayName": "Jane Doe"})),
        "p2" => Json(json!({"emails": ["locked@example.com"], "displayName": "Locked Out"})),
        "p3" => Json(json!({"emails": [], "displayName": "No Mail"})),
        _ => return (StatusCode::NOT_FOUND, Json(json!({"message": "no such person"}))).into_response(),
    }
    .into_response()
}

async fn recordings(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    match query.get("hostEmail").map(String::as_str) {
        Some("locked@example.com") => {
            (StatusCode::UNAUTHORIZED, Json(json!({"message": "unauthorized"}))).into_response()
        }
        Some("jane@example.com") if query.get("cursor").map(String::as_str) == Some("2") => {
            // second page omits hostEmail
            Json(json!({"items": [
                {"id": "r2", "topic": "Retro", "timeRecorded": "2022-05-02T10:00:00Z"}
            ]}))
            .into_response()
        }
        Some("jane@example.com") => {
            assert_eq!(query.get("from").map(String::as_str), Some("2022-05-01T00:00:00"));
            assert_eq!(query.get("to").map(String::as_str), Some("2022-05-31T23:59:59"));
            assert_eq!(query.get("siteUrl").map(String::as_str), Some("acme.webex.com"));

            let next = format!(
                "<{}/v1/recordings?hostEmail=jane%40example.com&cursor=2>; rel=\"next\"",
                state.base
            );
            (
                [(header::LINK, next)],
                Json(json!({"items": [
                    {"id": "r1", "topic": "Standup", "hostEmail": "jane@example.com",
                     "timeRecorded": "2022-05-01T10:00:00Z"}
                ]})),
            )
                .into_response()
        }
        _ => Json(json!({"items": []})).into_response(),
    }
}

async fn recording_details(State(state): State<StubState>, Path(id): Path<String>) -> Response {
    let (topic, recorded) = match id.as_str() {
        "r1" => ("Standup", "2022-05-01T10:00:00Z"),
        "r2" => ("Retro", "2022-05-02T10:00:00Z"),
        _ => return (StatusCode::NOT_FOUND, Json(json!({"message": "gone"}))).into_response(),
    };
    Json(json!({
        "id": id,
        "topic": topic,
        "timeRecorded": recorded,
        "temporaryDirectDownloadLinks": {
            "recordingDownloadLink": format!("{}/download/{}", state.base, id),
            "expiration": "2022-06-01T10:00:00Z"
        }
    }))
    .into_response()
}

async fn delete_recording(
    State(state): State<StubState>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    let host = query.get("hostEmail").cloned().unwrap_or_default();
    state.deletes.lock().unwrap().push((id.clone(), host));
    if id == "r2" {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn download(Path(id): Path<String>) -> Vec<u8> {
    format!("video bytes of {id}").into_bytes()
}

#[derive(Clone)]
struct PagingState {
    base: String,
    second_page_next: String,
}

/// A people directory of two pages whose second page links to
/// `second_page_next` (with `{base}` replaced by the stub address).
pub async fn spawn_paging_stub(second_page_next: &str) -> StubWebex {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let paging = PagingState {
        base: base.clone(),
        second_page_next: second_page_next.replace("{base}", &base),
    };

    let app = Router::new()
        .route("/v1/people", get(paged_people))
        .with_state(paging);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let state = StubState {
        base: base.clone(),
        deletes: Arc::new(Mutex::new(Vec::new())),
    };
    StubWebex { base, state }
}

async fn paged_people(
    State(paging): State<PagingState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let (id, next) = match query.get("cursor").map(String::as_str) {
        Some("2") => ("p2", paging.second_page_next.clone()),
        _ => (
            "p1",
            format!("{}/v1/people?max=100&cursor=2", paging.base),
        ),
    };
    (
        [(header::LINK, format!("<{next}>; rel=\"next\""))],
        Json(json!({"items": [
            {"id": id, "emails": [format!("{id}@example.com")], "displayName": id}
        ]})),
    )
        .into_response()
}
