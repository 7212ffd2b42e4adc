use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;

use bet_tracker::db::LocalStore;
use bet_tracker::models::BetEvent;
use bet_tracker::remote::RemoteClient;
use bet_tracker::BetTracker;

pub const TEST_API_KEY: &str = "test-key";

/// Temp directory plus the store path inside it. Keep the directory alive for
/// the duration of the test.
#[allow(dead_code)]
pub fn temp_store_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("tracker.db");
    (dir, path)
}

#[allow(dead_code)]
pub async fn open_store(path: &std::path::Path) -> LocalStore {
    LocalStore::open(path).await.expect("Failed to open local store")
}

/// Tracker without a remote backend.
#[allow(dead_code)]
pub async fn local_tracker(path: &std::path::Path) -> BetTracker {
    BetTracker::new(open_store(path).await, None)
}

/// Tracker backed by `remote`, mirroring into a store at `path`.
#[allow(dead_code)]
pub async fn remote_tracker(path: &std::path::Path, remote: RemoteClient) -> BetTracker {
    BetTracker::new(open_store(path).await, Some(remote))
}

/// Client pointed at a port nothing listens on.
#[allow(dead_code)]
pub fn dead_remote() -> RemoteClient {
    RemoteClient::new(reqwest::Client::new(), "http://127.0.0.1:1", TEST_API_KEY)
}

#[allow(dead_code)]
pub fn event(name: &str, market: &str, coef: &str) -> BetEvent {
    BetEvent::new(name, market, coef.parse::<Decimal>().expect("Bad coefficient"))
}

// ---------------------------------------------------------------------------
// Fake REST backend
// ---------------------------------------------------------------------------

/// In-process stand-in for a PostgREST-style backend: `eq.` filters,
/// `created_at` descending order, server-assigned ids and `created_at`.
#[derive(Clone)]
pub struct FakeRemote {
    pub base_url: String,
    state: FakeState,
}

#[derive(Clone, Default)]
struct FakeState {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    next_id: Arc<AtomicI64>,
    failing: Arc<AtomicBool>,
    requests: Arc<AtomicI64>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub async fn start() -> Self {
        let state = FakeState::default();
        state.next_id.store(100, Ordering::SeqCst);

        let app = Router::new()
            .route(
                "/:table",
                get(list_rows)
                    .post(insert_rows)
                    .patch(update_rows)
                    .delete(delete_rows),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn client(&self) -> RemoteClient {
        RemoteClient::new(reqwest::Client::new(), &self.base_url, TEST_API_KEY)
    }

    /// Make every request answer 503 until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .tables
            .lock()
            .expect("Fake backend lock poisoned")
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a row directly, bypassing the HTTP surface.
    pub fn seed(&self, table: &str, mut row: Value) -> i64 {
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(map) = row.as_object_mut() {
            map.insert("id".into(), json!(id));
            map.entry("created_at").or_insert_with(|| json!(now()));
        }
        self.state
            .tables
            .lock()
            .expect("Fake backend lock poisoned")
            .entry(table.to_string())
            .or_default()
            .push(row);
        id
    }

    /// Number of requests that reached a handler.
    pub fn request_count(&self) -> i64 {
        self.state.requests.load(Ordering::SeqCst)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Auth and failure injection shared by every handler.
fn gate(state: &FakeState, headers: &HeaderMap) -> Option<Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    if state.failing.load(Ordering::SeqCst) {
        return Some(
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"message": "service unavailable"})),
            )
                .into_response(),
        );
    }
    let authorized = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(TEST_API_KEY)
        && headers.get("authorization").and_then(|v| v.to_str().ok())
            == Some(format!("Bearer {TEST_API_KEY}").as_str());
    if !authorized {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"message": "Invalid API key"})),
            )
                .into_response(),
        );
    }
    None
}

fn eq_filters(params: &[(String, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, _)| k != "select" && k != "order")
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|v| (k.clone(), v.to_string())))
        .collect()
}

fn matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(field, expected)| match row.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => expected == "null",
        Some(other) => other.to_string() == *expected,
    })
}

async fn list_rows(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if let Some(resp) = gate(&state, &headers) {
        return resp;
    }
    let filters = eq_filters(&params);
    let tables = state.tables.lock().expect("Fake backend lock poisoned");
    let mut rows: Vec<Value> = tables
        .get(&table)
        .map(|rows| rows.iter().filter(|r| matches(r, &filters)).cloned().collect())
        .unwrap_or_default();

    if params.iter().any(|(k, v)| k == "order" && v == "created_at.desc") {
        rows.sort_by(|a, b| {
            let key = |r: &Value| {
                (
                    r["created_at"].as_str().unwrap_or_default().to_string(),
                    r["id"].as_i64().unwrap_or_default(),
                )
            };
            key(b).cmp(&key(a))
        });
    }
    Json(Value::Array(rows)).into_response()
}

async fn insert_rows(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(resp) = gate(&state, &headers) {
        return resp;
    }
    let incoming = match body {
        Value::Array(rows) => rows,
        row => vec![row],
    };

    let mut created = Vec::new();
    let mut tables = state.tables.lock().expect("Fake backend lock poisoned");
    let rows = tables.entry(table).or_default();
    for mut row in incoming {
        let Some(map) = row.as_object_mut() else {
            return (StatusCode::BAD_REQUEST, Json(json!({"message": "expected an object"})))
                .into_response();
        };
        let id = state.next_id.fetch_add(1, Ordering::SeqCst);
        map.insert("id".into(), json!(id));
        map.entry("created_at").or_insert_with(|| json!(now()));
        rows.push(row.clone());
        created.push(row);
    }
    (StatusCode::CREATED, Json(Value::Array(created))).into_response()
}

async fn update_rows(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    if let Some(resp) = gate(&state, &headers) {
        return resp;
    }
    let filters = eq_filters(&params);
    let Some(patch) = patch.as_object().cloned() else {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "expected an object"})))
            .into_response();
    };

    let mut tables = state.tables.lock().expect("Fake backend lock poisoned");
    let mut updated = Vec::new();
    for row in tables.entry(table).or_default().iter_mut() {
        if !matches(row, &filters) {
            continue;
        }
        if let Some(map) = row.as_object_mut() {
            for (k, v) in &patch {
                map.insert(k.clone(), v.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(Value::Array(updated)).into_response()
}

async fn delete_rows(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if let Some(resp) = gate(&state, &headers) {
        return resp;
    }
    let filters = eq_filters(&params);
    let mut tables = state.tables.lock().expect("Fake backend lock poisoned");
    let rows = tables.entry(table).or_default();
    let (removed, kept): (Vec<Value>, Vec<Value>) =
        rows.drain(..).partition(|r| matches(r, &filters));
    *rows = kept;
    Json(Value::Array(removed)).into_response()
}
