#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use elpix_admin::auth::{ClientState, MemorySessionStore, SessionStore};
use elpix_admin::config::config;
use elpix_admin::models::User;
use elpix_admin::ApiClient;

pub const USERNAME: &str = "operator";
pub const PASSWORD: &str = "s3cret";
pub const ROLE_ID: &str = "role-operator";

/// Shared state of the mock backend
pub struct MockState {
    /// `expiredToken` handed out by login
    pub login_expiry: Mutex<String>,
    /// Token the protected routes accept
    pub valid_token: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub fail_refresh: AtomicBool,
    /// Refresh answers 503 while set
    pub refresh_outage: AtomicBool,
    pub refresh_delay: Mutex<Duration>,
    /// Bearer tokens seen on protected routes, in arrival order
    pub seen_tokens: Mutex<Vec<String>>,
    /// (status, progress) served by `GET /api/v1/enhance/:id`; the last entry repeats
    pub job_script: Mutex<VecDeque<(i32, f64)>>,
    pub job_calls: AtomicUsize,
    pub active_script: Mutex<VecDeque<Vec<(i64, i32, f64)>>>,
    pub active_calls: AtomicUsize,
    /// Replaces the `data` of `GET /api/v1/role/permission` when set
    pub permission_data: Mutex<Option<Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            login_expiry: Mutex::new("1h".to_string()),
            valid_token: Mutex::new("access-1".to_string()),
            refresh_calls: AtomicUsize::new(0),
            fail_refresh: AtomicBool::new(false),
            refresh_outage: AtomicBool::new(false),
            refresh_delay: Mutex::new(Duration::from_millis(50)),
            seen_tokens: Mutex::new(Vec::new()),
            job_script: Mutex::new(VecDeque::new()),
            job_calls: AtomicUsize::new(0),
            active_script: Mutex::new(VecDeque::new()),
            active_calls: AtomicUsize::new(0),
            permission_data: Mutex::new(None),
        }
    }
}

impl MockState {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn job_calls(&self) -> usize {
        self.job_calls.load(Ordering::SeqCst)
    }

    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::SeqCst)
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().unwrap().clone()
    }

    pub fn script_job(&self, steps: &[(i32, f64)]) {
        *self.job_script.lock().unwrap() = steps.iter().copied().collect();
    }

    pub fn script_active(&self, rounds: Vec<Vec<(i64, i32, f64)>>) {
        *self.active_script.lock().unwrap() = rounds.into();
    }
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let state = Arc::new(MockState::default());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, state })
    }

    /// Client over an in-memory session
    pub fn client_with(&self, session: ClientState) -> Result<ApiClient> {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(session));
        Ok(ApiClient::new(&self.base_url, store, config())?)
    }

    pub fn client(&self) -> Result<ApiClient> {
        self.client_with(ClientState::default())
    }
}

pub fn operator() -> User {
    serde_json::from_value(user_json()).expect("valid user fixture")
}

/// Session whose access token expired a minute ago
pub fn expired_session() -> ClientState {
    let mut state = ClientState::default();
    let past = elpix_admin::auth::expiry::now_ms() - 60_000;
    state.set_login("stale-token", "refresh-1", past, Some(&operator()));
    state.set_locale("id");
    state
}

fn user_json() -> Value {
    json!({
        "id": "u-1",
        "username": USERNAME,
        "fullname": "Studio Operator",
        "email": "operator@example.com",
        "role": "Operator",
        "roleId": ROLE_ID,
        "isActive": true
    })
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/v1/login", post(login))
        .route("/api/v1/refresh-token", post(refresh_token))
        .route("/api/v1/profile", get(profile))
        .route("/api/v1/role/permission", get(role_permission))
        .route("/api/v1/enhance/process", get(active_jobs))
        .route("/api/v1/enhance/:id", get(enhance_job))
        .route("/api/v1/video/:id", get(video))
        .with_state(state)
}

fn success(message: &str, data: Value) -> Response {
    Json(json!({ "status": "success", "message": message, "data": data })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "message": message }))).into_response()
}

// Records the bearer token and rejects anything but the current one
fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("")
        .to_string();
    state.seen_tokens.lock().unwrap().push(token.clone());

    if token == *state.valid_token.lock().unwrap() {
        Ok(())
    } else {
        Err(failure(StatusCode::UNAUTHORIZED, "jwt expired"))
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

async fn login(State(state): State<Arc<MockState>>, Json(req): Json<LoginRequest>) -> Response {
    if req.username != USERNAME || req.password != PASSWORD {
        return failure(StatusCode::BAD_REQUEST, "Invalid username or password");
    }
    let mut data = user_json();
    data["token"] = json!(state.valid_token.lock().unwrap().clone());
    data["refreshToken"] = json!("refresh-1");
    data["expiredToken"] = json!(state.login_expiry.lock().unwrap().clone());
    success("Login successfully", data)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh_token(State(state): State<Arc<MockState>>, Json(req): Json<RefreshRequest>) -> Response {
    let call = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = *state.refresh_delay.lock().unwrap();
    tokio::time::sleep(delay).await;

    if state.refresh_outage.load(Ordering::SeqCst) {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable");
    }
    if state.fail_refresh.load(Ordering::SeqCst) || req.refresh_token != "refresh-1" {
        return failure(StatusCode::UNAUTHORIZED, "Refresh token expired");
    }

    let token = format!("access-{}", call + 1);
    *state.valid_token.lock().unwrap() = token.clone();
    success("Token refreshed", json!({ "token": token, "expiredToken": "1h" }))
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    success("Success", user_json())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleQuery {
    role_id: String,
}

async fn role_permission(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<RoleQuery>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if let Some(data) = state.permission_data.lock().unwrap().clone() {
        return success("Success", data);
    }
    if query.role_id != ROLE_ID {
        return Json(json!({ "status": "error", "message": "Role not found", "data": [] })).into_response();
    }

    let access = |id: &str, name: &str, active: bool| json!({ "id": id, "name": name, "isActive": active });
    success(
        "Success",
        json!([{
            "id": "rp-1",
            "role": { "name": "Operator" },
            "menus": [
                {
                    "id": "m-work",
                    "name": "Worksheet",
                    "parentId": null,
                    "sequenceNo": 1,
                    "accesses": [
                        access("a-1", "Read", true),
                        access("a-2", "Create", true),
                        access("a-3", "Delete", false)
                    ]
                },
                {
                    "id": "m-enh",
                    "name": "Video Enhance",
                    "parentId": "m-work",
                    "sequenceNo": 2,
                    "accesses": [access("a-4", "Download", true)]
                }
            ]
        }]),
    )
}

fn job_json(id: &str, status: i32, progress: f64) -> Value {
    json!({
        "id": id,
        "status": status,
        "processingProgress": progress,
        "started": "2025-04-20T08:15:00.000Z",
        "inputVideo": { "id": 41, "name": "harbor.mov", "nFrames": 500 }
    })
}

async fn enhance_job(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    state.job_calls.fetch_add(1, Ordering::SeqCst);

    let step = {
        let mut script = state.job_script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().copied()
        }
    };
    match step {
        Some((status, progress)) => success("Success", job_json(&id, status, progress)),
        None => failure(StatusCode::NOT_FOUND, "Enhance not found"),
    }
}

async fn active_jobs(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    state.active_calls.fetch_add(1, Ordering::SeqCst);

    let round = state.active_script.lock().unwrap().pop_front().unwrap_or_default();
    let jobs: Vec<Value> = round
        .into_iter()
        .map(|(id, status, progress)| job_json(&id.to_string(), status, progress))
        .collect();
    success("Success", json!(jobs))
}

async fn video(State(state): State<Arc<MockState>>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    if id != "41" {
        return failure(StatusCode::NOT_FOUND, "Video not found");
    }
    success(
        "Success",
        json!({
            "id": 41,
            "name": "harbor.mov",
            "width": 1920,
            "height": 1080,
            "nFrames": 500,
            "framerate": 25.0,
            "size": 73400320,
            "bitrate": 12000000,
            "bitDepth": 8,
            "chromaSubsampling": "4:2:0"
        }),
    )
}
