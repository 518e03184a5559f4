//! Async client for the W3C WebDriver wire format as served by Appium.
//!
//! This module provides two layers:
//!
//! - [`WebDriverClient`]: server-level requests (status, session discovery,
//!   session capabilities). It never creates or deletes sessions.
//! - [`WebDriverSession`]: a [`WebDriverClient`] bound to one existing session
//!   id, implementing [`AutomationDriver`].
//!
//! Every response body is a JSON envelope `{"value": ...}`. Failures are
//! non-2xx responses whose `value` carries `{"error": .., "message": ..}`;
//! they are mapped onto [`DriverError`] variants.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tapwright_core::webdriver::WebDriverClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebDriverClient::new("http://127.0.0.1:4723", Duration::from_secs(30))?;
//! for session in client.list_sessions().await? {
//!     println!("{}", session.id);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, debug_span, trace, Instrument};

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementHandle, ElementRef};

/// Locator strategy for accessibility identifiers.
pub const ACCESSIBILITY_ID: &str = "accessibility id";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// A live session as reported by the server's session listing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionInfo {
    /// Server-assigned session id.
    #[serde(alias = "sessionId")]
    pub id: String,
    /// Capabilities the session was created with (or negotiated).
    #[serde(default)]
    pub capabilities: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps a transport-level [`reqwest::Error`] to a [`DriverError`].
fn map_reqwest_error(err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        DriverError::Timeout
    } else if err.is_connect() || err.is_request() {
        DriverError::ConnectionLost(err.to_string())
    } else {
        DriverError::CommandFailed(err.to_string())
    }
}

/// Maps a non-2xx response body to a [`DriverError`].
///
/// Unknown W3C error codes become [`DriverError::CommandFailed`] carrying
/// both the code and the server's message.
pub(crate) fn error_from_body(status: StatusCode, body: &[u8]) -> DriverError {
    let parsed: Option<ErrorValue> = serde_json::from_slice::<Envelope<ErrorValue>>(body)
        .ok()
        .map(|envelope| envelope.value);

    let Some(err) = parsed else {
        let text = String::from_utf8_lossy(body);
        return DriverError::CommandFailed(format!("HTTP {}: {}", status.as_u16(), text.trim()));
    };

    match err.error.as_str() {
        "no such element" => DriverError::NoSuchElement(err.message),
        "stale element reference" => DriverError::StaleElement(err.message),
        "invalid session id" => DriverError::InvalidSession(err.message),
        code => DriverError::CommandFailed(format!("{code}: {}", err.message)),
    }
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, DriverError> {
    serde_json::from_slice::<Envelope<T>>(body)
        .map(|envelope| envelope.value)
        .map_err(|e| DriverError::JsonParse(e.to_string()))
}

/// Decodes a base64 screenshot payload, tolerating embedded line breaks.
pub(crate) fn decode_screenshot(encoded: &str) -> Result<Vec<u8>, DriverError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| DriverError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// WebDriverClient
// ---------------------------------------------------------------------------

/// HTTP client for one automation server.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    /// Create a client for the server at `base_url`.
    ///
    /// `request_timeout` bounds every individual HTTP request.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, DriverError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DriverError::CommandFailed(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The server base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and return the raw status and body.
    async fn request_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Vec<u8>), DriverError> {
        let url = format!("{}{}", self.base_url, path);
        let span = debug_span!("webdriver_request", %method, path);
        async {
            let mut request = self.http.request(method, &url);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await.map_err(map_reqwest_error)?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(map_reqwest_error)?;
            trace!(status = status.as_u16(), body_bytes = bytes.len(), "response received");
            Ok::<_, DriverError>((status, bytes.to_vec()))
        }
        .instrument(span)
        .await
    }

    /// Send a request and decode the `value` of a successful response.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, DriverError> {
        let (status, bytes) = self.request_raw(method, path, body).await?;
        if !status.is_success() {
            return Err(error_from_body(status, &bytes));
        }
        decode_json(&bytes)
    }

    /// Query `GET /status`. Returns the server's status object.
    pub async fn status(&self) -> Result<Value, DriverError> {
        self.request(Method::GET, "/status", None).await
    }

    /// List live sessions on the server.
    ///
    /// Tries the Appium 2 endpoint `/appium/sessions` first and falls back
    /// to the Appium 1 endpoint `/sessions` when the former is not routed.
    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>, DriverError> {
        let (status, bytes) = self
            .request_raw(Method::GET, "/appium/sessions", None)
            .await?;
        if status.is_success() {
            return decode_json(&bytes);
        }
        if status != StatusCode::NOT_FOUND {
            return Err(error_from_body(status, &bytes));
        }

        debug!("/appium/sessions not available, falling back to /sessions");
        self.request(Method::GET, "/sessions", None).await
    }

    /// Fetch the capabilities of an existing session.
    pub async fn session_capabilities(
        &self,
        session_id: &str,
    ) -> Result<Map<String, Value>, DriverError> {
        self.request(Method::GET, &format!("/session/{session_id}"), None)
            .await
    }

    /// Bind this client to an existing session id.
    ///
    /// No request is made; use [`session_capabilities`](Self::session_capabilities)
    /// to verify the session is live.
    pub fn attach(&self, session_id: impl Into<String>) -> WebDriverSession {
        WebDriverSession {
            client: self.clone(),
            session_id: session_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// WebDriverSession
// ---------------------------------------------------------------------------

/// An [`AutomationDriver`] bound to one existing WebDriver session.
///
/// The session is borrowed: dropping this value does not end it.
#[derive(Debug, Clone)]
pub struct WebDriverSession {
    client: WebDriverClient,
    session_id: String,
}

impl WebDriverSession {
    /// The client this session talks through.
    pub fn client(&self) -> &WebDriverClient {
        &self.client
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    fn element_path(&self, element: &ElementHandle, suffix: &str) -> String {
        self.path(&format!("/element/{}{}", element.id, suffix))
    }
}

#[async_trait]
impl AutomationDriver for WebDriverSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn find_element(&self, accessibility_id: &str) -> Result<ElementHandle, DriverError> {
        let body = json!({ "using": ACCESSIBILITY_ID, "value": accessibility_id });
        let element: ElementRef = self
            .client
            .request(Method::POST, &self.path("/element"), Some(&body))
            .await?;
        debug!(accessibility_id, element_id = %element.id, "element found");
        Ok(ElementHandle::new(element.id, accessibility_id))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let _: Value = self
            .client
            .request(
                Method::POST,
                &self.element_path(element, "/click"),
                Some(&json!({})),
            )
            .await?;
        debug!(accessibility_id = %element.accessibility_id, "clicked");
        Ok(())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.client
            .request(Method::GET, &self.element_path(element, "/displayed"), None)
            .await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.client
            .request(Method::GET, &self.element_path(element, "/enabled"), None)
            .await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let encoded: String = self
            .client
            .request(Method::GET, &self.path("/screenshot"), None)
            .await?;
        let data = decode_screenshot(&encoded)?;
        debug!(bytes = data.len(), "screenshot captured");
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
