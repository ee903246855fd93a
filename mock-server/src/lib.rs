use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use axum::{
    extract::{OriginalUri, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_VERSION: &str = "v1";
pub const DEFAULT_TOKEN: &str = "secret";
pub const SOURCE: &str = "tag:mock-server,2024:eventstore";

const NDJSON: &str = "application/x-ndjson";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoredEvent {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub subject: String,
    pub time: String,
    pub specversion: String,
    pub datacontenttype: String,
}

#[derive(Debug, Deserialize)]
pub struct CandidateEvent {
    pub subject: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub events: Vec<CandidateEvent>,
}

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    pub subject: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Path and headers of one request as it reached the server.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedRequest {
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl ReceivedRequest {
    /// Every value sent under `name`, compared case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[derive(Default)]
struct Store {
    events: Vec<StoredEvent>,
    raw_streams: HashMap<String, Vec<u8>>,
    received: Vec<ReceivedRequest>,
}

/// Shared server state: the accepted token and the in-memory log.
#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    store: Arc<RwLock<Store>>,
}

impl AppState {
    pub fn new(token: &str) -> Self {
        Self {
            token: Arc::from(token),
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    /// Serve `body` verbatim for `stream` requests on `subject`, bypassing
    /// the stored log. Lets tests feed malformed NDJSON to a client.
    pub async fn seed_raw_stream(&self, subject: &str, body: impl Into<Vec<u8>>) {
        self.store
            .write()
            .await
            .raw_streams
            .insert(subject.to_string(), body.into());
    }

    /// Requests seen so far under `/api/{version}`, authorized or not.
    pub async fn received(&self) -> Vec<ReceivedRequest> {
        self.store.read().await.received.clone()
    }

    pub async fn events(&self) -> Vec<StoredEvent> {
        self.store.read().await.events.clone()
    }
}

pub fn app() -> Router {
    app_with_state(AppState::new(DEFAULT_TOKEN))
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/stream", post(stream_events))
        .route("/commit", post(commit_events))
        .route("/q", post(run_query))
        .route("/status/ping", get(ping))
        .route("/status/audit", get(audit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .nest(&format!("/api/{API_VERSION}"), api)
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new(DEFAULT_TOKEN)).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let received = ReceivedRequest {
        path: request
            .extensions()
            .get::<OriginalUri>()
            .map_or_else(|| request.uri().path(), |uri| uri.0.path())
            .to_string(),
        headers: request
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
    };
    state.store.write().await.received.push(received);

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*state.token);
    if !authorized {
        tracing::warn!(uri = %request.uri(), "Rejected request without a valid bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}

fn ndjson<T: Serialize>(items: &[T]) -> Result<Response, StatusCode> {
    let mut body = String::new();
    for item in items {
        let line = serde_json::to_string(item).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        body.push_str(&line);
        body.push('\n');
    }
    Ok(([(header::CONTENT_TYPE, NDJSON)], body).into_response())
}

async fn stream_events(
    State(state): State<AppState>,
    Json(input): Json<StreamRequest>,
) -> Result<Response, StatusCode> {
    let store = state.store.read().await;
    if let Some(raw) = store.raw_streams.get(&input.subject) {
        return Ok(([(header::CONTENT_TYPE, NDJSON)], raw.clone()).into_response());
    }
    let matching: Vec<&StoredEvent> = store
        .events
        .iter()
        .filter(|event| event.subject == input.subject)
        .collect();
    ndjson(&matching)
}

async fn commit_events(
    State(state): State<AppState>,
    Json(input): Json<CommitRequest>,
) -> Result<Json<Vec<StoredEvent>>, StatusCode> {
    if input
        .events
        .iter()
        .any(|e| e.subject.is_empty() || e.event_type.is_empty())
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut store = state.store.write().await;
    let time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let committed: Vec<StoredEvent> = input
        .events
        .into_iter()
        .map(|candidate| StoredEvent {
            id: Uuid::new_v4().to_string(),
            source: SOURCE.to_string(),
            event_type: candidate.event_type,
            data: candidate.data,
            subject: candidate.subject,
            time: time.clone(),
            specversion: "1.0".to_string(),
            datacontenttype: "application/json".to_string(),
        })
        .collect();
    store.events.extend(committed.iter().cloned());
    tracing::debug!(count = committed.len(), "Committed events");
    Ok(Json(committed))
}

/// Queries are not interpreted; every stored event comes back as one row.
async fn run_query(
    State(state): State<AppState>,
    Json(input): Json<QueryRequest>,
) -> Result<Response, StatusCode> {
    if input.query.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let store = state.store.read().await;
    ndjson(&store.events)
}

async fn ping() -> &'static str {
    "OK"
}

async fn audit(State(state): State<AppState>) -> String {
    let store = state.store.read().await;
    let subjects: BTreeSet<&str> = store.events.iter().map(|e| e.subject.as_str()).collect();
    format!("events: {}\nsubjects: {}\n", store.events.len(), subjects.len())
}
