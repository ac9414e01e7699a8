// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: an in-process identity/resource backend and
//! config builders.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{json, Value};

use crate::config::GatewayConfig;

/// How the mock answers `auth/token/refresh/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Issue a new access token only.
    Access,
    /// Issue a new access token and rotate the refresh token.
    AccessAndRefresh,
    /// Reject every refresh with 401.
    Reject,
    /// Fail every refresh with the given status.
    Fail(u16),
}

/// Shared mock state. Counters are observable from tests.
pub struct MockState {
    pub login_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub resource_calls: AtomicU32,
    generation: AtomicU32,
    /// Refresh token -> currently valid access token.
    tokens: Mutex<HashMap<String, String>>,
    refresh_mode: Mutex<RefreshMode>,
    refresh_delay: Mutex<Duration>,
    last_authorization: Mutex<Option<String>>,
    last_body: Mutex<Option<Value>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockState {
    fn new() -> Self {
        Self {
            login_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            resource_calls: AtomicU32::new(0),
            generation: AtomicU32::new(0),
            tokens: Mutex::new(HashMap::new()),
            refresh_mode: Mutex::new(RefreshMode::Access),
            refresh_delay: Mutex::new(Duration::ZERO),
            last_authorization: Mutex::new(None),
            last_body: Mutex::new(None),
        }
    }

    fn next_generation(&self) -> u32 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn issue_pair(&self) -> (String, String) {
        let n = self.next_generation();
        let (access, refresh) = (format!("A{n}"), format!("R{n}"));
        locked(&self.tokens).insert(refresh.clone(), access.clone());
        (access, refresh)
    }

    fn is_valid_access(&self, token: &str) -> bool {
        locked(&self.tokens).values().any(|a| a == token)
    }
}

/// A running mock backend serving under `http://<addr>/api/`.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(MockState::new());
        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self { addr, state })
    }

    /// Base URL including the trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    pub fn base(&self) -> anyhow::Result<Url> {
        Ok(Url::parse(&self.url())?)
    }

    pub fn login_calls(&self) -> u32 {
        self.state.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> u32 {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn resource_calls(&self) -> u32 {
        self.state.resource_calls.load(Ordering::SeqCst)
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *locked(&self.state.refresh_mode) = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *locked(&self.state.refresh_delay) = delay;
    }

    /// `Authorization` header of the most recent resource call.
    pub fn last_authorization(&self) -> Option<String> {
        locked(&self.state.last_authorization).clone()
    }

    /// JSON body of the most recent resource call, if it had one.
    pub fn last_body(&self) -> Option<Value> {
        locked(&self.state.last_body).clone()
    }

    /// Forget every issued token, as if the backend rotated its signing key.
    pub fn revoke_all(&self) {
        locked(&self.state.tokens).clear();
    }
}

/// A base URL nobody is listening on.
pub async fn unreachable_url() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api/"))
}

/// Gateway config pointing at `backend_url` with test-friendly defaults.
pub fn test_config(backend_url: &str) -> GatewayConfig {
    GatewayConfig {
        backend_url: Some(backend_url.to_owned()),
        host: "127.0.0.1".into(),
        port: 0,
        access_lifetime_secs: 45 * 60,
        refresh_lifetime_secs: 6 * 24 * 60 * 60,
        backend_timeout_ms: 2000,
        resources: vec!["movies".into(), "users".into()],
        federated_providers: vec!["google".into()],
        state_file: None,
        log_format: "text".into(),
        log_level: "debug".into(),
    }
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/google/", post(google))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/movies/", get(list_movies).post(create_movie))
        .route("/api/movies/{id}/", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/api/users/", get(list_users))
        .route("/api/notes/", post(create_note))
        .with_state(state)
}

fn user(pk: u32, email: &str) -> Value {
    json!({ "pk": pk, "email": email, "username": email.split('@').next().unwrap_or(email) })
}

async fn login(State(s): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    s.login_calls.fetch_add(1, Ordering::SeqCst);
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if email.is_empty() || password == "wrong" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "non_field_errors": ["Unable to log in with provided credentials."] })),
        )
            .into_response();
    }
    let (access, refresh) = s.issue_pair();
    Json(json!({ "user": user(1, email), "access": access, "refresh": refresh })).into_response()
}

async fn google(State(s): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    s.login_calls.fetch_add(1, Ordering::SeqCst);
    match body["access_token"].as_str() {
        Some("bad-assertion") | None => {
            (StatusCode::BAD_REQUEST, Json(json!({ "detail": "Invalid Google token" })))
                .into_response()
        }
        Some(_) => {
            let (access, refresh) = s.issue_pair();
            Json(json!({ "user": user(2, "g@example.com"), "access": access, "refresh": refresh }))
                .into_response()
        }
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["password"] != body["password_confirm"] {
        return (StatusCode::BAD_REQUEST, Json(json!({ "password": ["Passwords do not match."] })))
            .into_response();
    }
    // An invited account already exists and is only activated.
    let status = if body["username"] == "invited" { StatusCode::OK } else { StatusCode::CREATED };
    (
        status,
        Json(json!({
            "user": { "pk": 3, "username": body["username"], "email": body["email"] },
            "message": "User registered successfully",
        })),
    )
        .into_response()
}

async fn refresh(State(s): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    s.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *locked(&s.refresh_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mode = *locked(&s.refresh_mode);
    let presented = body["refresh"].as_str().unwrap_or_default().to_owned();
    match mode {
        RefreshMode::Reject => return token_not_valid(),
        RefreshMode::Fail(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, "upstream exploded").into_response();
        }
        RefreshMode::Access | RefreshMode::AccessAndRefresh => {}
    }

    let n = s.next_generation();
    let access = format!("A{n}");
    let mut tokens = locked(&s.tokens);
    if tokens.remove(&presented).is_none() {
        return token_not_valid();
    }
    if mode == RefreshMode::AccessAndRefresh {
        let rotated = format!("R{n}");
        tokens.insert(rotated.clone(), access.clone());
        Json(json!({ "access": access, "refresh": rotated })).into_response()
    } else {
        tokens.insert(presented, access.clone());
        Json(json!({ "access": access })).into_response()
    }
}

fn token_not_valid() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" })),
    )
        .into_response()
}

/// Record the call and check the bearer token. `Err` is the 401 to return.
fn admit(s: &MockState, headers: &HeaderMap, body: Option<&Value>) -> Result<(), Response> {
    s.resource_calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_owned);
    *locked(&s.last_authorization) = auth.clone();
    *locked(&s.last_body) = body.cloned();

    let token = auth.as_deref().and_then(|a| a.strip_prefix("Bearer ")).unwrap_or_default();
    if s.is_valid_access(token) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Given token not valid for any token type" })),
        )
            .into_response())
    }
}

fn movie(id: &str, title: &str) -> Value {
    json!({ "id": id, "title": title })
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
}

async fn list_movies(State(s): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(r) = admit(&s, &headers, None) {
        return r;
    }
    Json(json!([movie("1", "Alien"), movie("2", "Heat")])).into_response()
}

async fn create_movie(
    State(s): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = admit(&s, &headers, Some(&body)) {
        return r;
    }
    match body["title"].as_str() {
        Some(title) if !title.is_empty() => {
            (StatusCode::CREATED, Json(movie("3", title))).into_response()
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({ "title": ["This field is required."] })))
            .into_response(),
    }
}

async fn get_movie(
    State(s): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = admit(&s, &headers, None) {
        return r;
    }
    match id.as_str() {
        "999" => not_found(),
        "my_movies" => Json(json!([movie("1", "Alien")])).into_response(),
        _ => Json(movie(&id, "Alien")).into_response(),
    }
}

async fn update_movie(
    State(s): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = admit(&s, &headers, Some(&body)) {
        return r;
    }
    if id == "999" {
        return not_found();
    }
    Json(movie(&id, body["title"].as_str().unwrap_or("untitled"))).into_response()
}

async fn delete_movie(
    State(s): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(r) = admit(&s, &headers, None) {
        return r;
    }
    if id == "999" {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_users(State(s): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(r) = admit(&s, &headers, None) {
        return r;
    }
    Json(json!([user(1, "a@b.com")])).into_response()
}

/// Answers a create with a plain-text body.
async fn create_note(
    State(s): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = admit(&s, &headers, Some(&body)) {
        return r;
    }
    (StatusCode::CREATED, "created").into_response()
}

/// Spawn the gateway HTTP server on a random port for integration testing.
///
/// Returns the bound address and a join handle for the server task.
pub async fn spawn_http_server(
    state: Arc<crate::state::GatewayState>,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let router = crate::transport::build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle))
}
