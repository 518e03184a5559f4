//! Shared test helpers for tapwright-core integration tests.
//!
//! This module provides two kinds of mock infrastructure:
//!
//! - [`MockDriver`]: an in-process [`AutomationDriver`] with scripted
//!   elements, for fixture, wait and scenario tests.
//! - [`start_mock_server`]: an HTTP server speaking enough of the W3C
//!   WebDriver / Appium surface to exercise the real client end to end.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

use tapwright_core::config::HarnessConfig;
use tapwright_core::driver::{AutomationDriver, DriverError};
use tapwright_core::element::{ElementHandle, W3C_ELEMENT_KEY};

// ---------------------------------------------------------------------------
// Temp directories
// ---------------------------------------------------------------------------

/// A fresh, not-yet-created directory under the system temp dir.
///
/// Uses a UUID suffix to avoid collisions between concurrent test runs.
pub fn unique_dir(prefix: &str) -> PathBuf {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    std::env::temp_dir().join(format!("tapwright_{prefix}_{}", &suffix[..8]))
}

/// A config pointing at `server_url` with fast polling and a private
/// screenshot directory.
pub fn test_config(server_url: &str) -> HarnessConfig {
    let mut config = HarnessConfig::new(server_url);
    config.screenshot_dir = unique_dir("shots");
    config.request_timeout_ms = 5_000;
    config.wait.poll_interval_ms = 10;
    config.wait.timeout_ms = 500;
    config.wait.settle_timeout_ms = 200;
    config
}

// ---------------------------------------------------------------------------
// MockDriver
// ---------------------------------------------------------------------------

/// A driver call, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Find(String),
    Click(String),
    IsDisplayed(String),
    IsEnabled(String),
    Screenshot,
}

/// Scripted state of one element.
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Number of lookups that miss before the element appears.
    pub missing_for: u32,
    /// Lookups after which the element becomes displayed (counted after it appears).
    pub hidden_for: u32,
    pub enabled: bool,
    /// Remove the element from the UI once clicked.
    pub dismiss_on_click: bool,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            missing_for: 0,
            hidden_for: 0,
            enabled: true,
            dismiss_on_click: true,
        }
    }
}

#[derive(Default)]
struct MockState {
    elements: HashMap<String, MockElement>,
    lookups: HashMap<String, u32>,
    displayed_checks: HashMap<String, u32>,
    dismissed: Vec<String>,
    session_dead: bool,
    screenshots: u32,
    calls: Vec<Call>,
    latency: Duration,
}

/// In-process [`AutomationDriver`] with scripted elements.
///
/// Each screenshot returns distinct bytes (`PNG frame <n>`), so tests can
/// tell captures apart.
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_element(self, accessibility_id: &str, element: MockElement) -> Self {
        self.state
            .lock()
            .unwrap()
            .elements
            .insert(accessibility_id.to_string(), element);
        self
    }

    /// Every element lookup takes `latency` before answering.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = latency;
        self
    }

    /// Every subsequent call fails with [`DriverError::InvalidSession`].
    pub fn end_session(&self) {
        self.state.lock().unwrap().session_dead = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Click(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// The bytes the `n`th screenshot (1-based) returns.
    pub fn frame(n: u32) -> Vec<u8> {
        format!("PNG frame {n}").into_bytes()
    }

    fn record(&self, call: Call) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.session_dead {
            return Err(DriverError::InvalidSession("session terminated".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    fn session_id(&self) -> &str {
        "mock-session"
    }

    async fn find_element(&self, accessibility_id: &str) -> Result<ElementHandle, DriverError> {
        let latency = self.state.lock().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.record(Call::Find(accessibility_id.to_string()))?;
        let mut state = self.state.lock().unwrap();
        let Some(element) = state.elements.get(accessibility_id).cloned() else {
            return Err(DriverError::NoSuchElement(accessibility_id.to_string()));
        };
        if state.dismissed.iter().any(|d| d == accessibility_id) {
            return Err(DriverError::NoSuchElement(accessibility_id.to_string()));
        }
        let seen = state.lookups.entry(accessibility_id.to_string()).or_insert(0);
        *seen += 1;
        if *seen <= element.missing_for {
            return Err(DriverError::NoSuchElement(accessibility_id.to_string()));
        }
        Ok(ElementHandle::new(format!("el-{accessibility_id}"), accessibility_id))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(Call::Click(element.accessibility_id.clone()))?;
        let mut state = self.state.lock().unwrap();
        let dismiss = state
            .elements
            .get(&element.accessibility_id)
            .map_or(false, |e| e.dismiss_on_click);
        if dismiss {
            state.dismissed.push(element.accessibility_id.clone());
        }
        Ok(())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.record(Call::IsDisplayed(element.accessibility_id.clone()))?;
        let mut state = self.state.lock().unwrap();
        let hidden_for = state
            .elements
            .get(&element.accessibility_id)
            .map_or(0, |e| e.hidden_for);
        let checks = state
            .displayed_checks
            .entry(element.accessibility_id.clone())
            .or_insert(0);
        *checks += 1;
        Ok(*checks > hidden_for)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.record(Call::IsEnabled(element.accessibility_id.clone()))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .elements
            .get(&element.accessibility_id)
            .map_or(false, |e| e.enabled))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.record(Call::Screenshot)?;
        let mut state = self.state.lock().unwrap();
        state.screenshots += 1;
        Ok(Self::frame(state.screenshots))
    }
}

// ---------------------------------------------------------------------------
// Mock WebDriver server
// ---------------------------------------------------------------------------

/// What the mock server exposes.
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    /// Session listing entries: `{"id": .., "capabilities": {..}}`.
    pub sessions: Vec<Value>,
    /// Answer `/appium/sessions` with 404, as an Appium 1 server would.
    pub legacy_only: bool,
    /// Accessibility ids that resolve to elements. A clicked element is
    /// treated as dismissed and no longer resolves.
    pub elements: Vec<String>,
    /// Raw screenshot bytes (served base64-encoded).
    pub screenshot: Vec<u8>,
}

/// Shared state of a running mock server.
pub struct ServerState {
    config: MockServer,
    requests: Mutex<Vec<String>>,
    clicked: Mutex<Vec<String>>,
}

impl ServerState {
    /// Requests received so far, as `"<METHOD> <path>"`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn log(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }

    fn session(&self, id: &str) -> Option<&Value> {
        self.config.sessions.iter().find(|s| s["id"] == id)
    }
}

type Shared = Arc<ServerState>;

fn ok(value: Value) -> Response {
    Json(json!({ "value": value })).into_response()
}

fn w3c_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "value": { "error": error, "message": message, "stacktrace": "" } })),
    )
        .into_response()
}

fn invalid_session(id: &str) -> Response {
    w3c_error(
        StatusCode::NOT_FOUND,
        "invalid session id",
        &format!("A session is either terminated or not started ({id})"),
    )
}

async fn status(State(state): State<Shared>) -> Response {
    state.log("GET /status".into());
    ok(json!({ "ready": true, "message": "mock appium" }))
}

async fn appium_sessions(State(state): State<Shared>) -> Response {
    state.log("GET /appium/sessions".into());
    if state.config.legacy_only {
        return w3c_error(StatusCode::NOT_FOUND, "unknown command", "not routed");
    }
    ok(Value::Array(state.config.sessions.clone()))
}

async fn legacy_sessions(State(state): State<Shared>) -> Response {
    state.log("GET /sessions".into());
    ok(Value::Array(state.config.sessions.clone()))
}

async fn get_session(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    state.log(format!("GET /session/{id}"));
    match state.session(&id) {
        Some(session) => ok(session["capabilities"].clone()),
        None => invalid_session(&id),
    }
}

async fn find_element(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.log(format!("POST /session/{id}/element"));
    if state.session(&id).is_none() {
        return invalid_session(&id);
    }
    if body["using"] != "accessibility id" {
        return w3c_error(StatusCode::BAD_REQUEST, "invalid argument", "unsupported locator");
    }
    let wanted = body["value"].as_str().unwrap_or_default();
    let dismissed = state
        .clicked
        .lock()
        .unwrap()
        .contains(&format!("el-{wanted}"));
    if !dismissed && state.config.elements.iter().any(|e| e == wanted) {
        let mut element = Map::new();
        element.insert(W3C_ELEMENT_KEY.to_string(), json!(format!("el-{wanted}")));
        ok(Value::Object(element))
    } else {
        w3c_error(
            StatusCode::NOT_FOUND,
            "no such element",
            "An element could not be located on the page using the given search parameters.",
        )
    }
}

async fn click(State(state): State<Shared>, Path((id, element)): Path<(String, String)>) -> Response {
    state.log(format!("POST /session/{id}/element/{element}/click"));
    if state.session(&id).is_none() {
        return invalid_session(&id);
    }
    state.clicked.lock().unwrap().push(element);
    ok(Value::Null)
}

async fn displayed(
    State(state): State<Shared>,
    Path((id, element)): Path<(String, String)>,
) -> Response {
    state.log(format!("GET /session/{id}/element/{element}/displayed"));
    ok(json!(true))
}

async fn enabled(
    State(state): State<Shared>,
    Path((id, element)): Path<(String, String)>,
) -> Response {
    state.log(format!("GET /session/{id}/element/{element}/enabled"));
    ok(json!(true))
}

async fn screenshot(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    state.log(format!("GET /session/{id}/screenshot"));
    if state.session(&id).is_none() {
        return invalid_session(&id);
    }
    let encoded = base64::engine::general_purpose::STANDARD.encode(&state.config.screenshot);
    ok(Value::String(encoded))
}

/// Start a mock WebDriver server on an ephemeral port.
///
/// Returns the base URL and the shared state for inspecting requests.
pub async fn start_mock_server(config: MockServer) -> (String, Arc<ServerState>) {
    let state = Arc::new(ServerState {
        config,
        requests: Mutex::new(Vec::new()),
        clicked: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/status", get(status))
        .route("/appium/sessions", get(appium_sessions))
        .route("/sessions", get(legacy_sessions))
        .route("/session/:id", get(get_session))
        .route("/session/:id/element", post(find_element))
        .route("/session/:id/element/:element/click", post(click))
        .route("/session/:id/element/:element/displayed", get(displayed))
        .route("/session/:id/element/:element/enabled", get(enabled))
        .route("/session/:id/screenshot", get(screenshot))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

/// A base URL nothing is listening on.
pub async fn dead_server_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A session listing entry.
pub fn session_entry(id: &str, capabilities: Value) -> Value {
    json!({ "id": id, "capabilities": capabilities })
}
