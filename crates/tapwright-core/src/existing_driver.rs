//! Attaching to an automation session that is already running.
//!
//! [`ExistingDriver::attach`] resolves a live session on the configured
//! server and classifies its [`Platform`]. It never creates a session, and
//! never ends the one it attaches to.
//!
//! Resolution order:
//!
//! 1. If [`HarnessConfig::session_id`] is set, that session's capabilities
//!    are fetched; an unknown id is an error.
//! 2. Otherwise the server's live sessions are listed and the first one whose
//!    capabilities match [`HarnessConfig::capabilities`] is used.
//!
//! The platform comes from the session's `platformName` capability, falling
//! back to [`HarnessConfig::platform`].

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::HarnessConfig;
use crate::driver::{AutomationDriver, DriverError};
use crate::platform::Platform;
use crate::webdriver::{SessionInfo, WebDriverClient};

/// Failure to resolve an existing session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The automation server could not be reached.
    #[error("automation server unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: DriverError,
    },

    /// The server has no live sessions.
    #[error("no existing session on {0}")]
    NoSessions(String),

    /// Sessions exist but none matches the desired capabilities.
    #[error("none of {count} existing session(s) match the desired capabilities")]
    NoMatchingSession { count: usize },

    /// The configured session id is unknown to the server.
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// Neither the session nor the config names a supported platform.
    #[error("cannot determine platform of session {0}")]
    UnknownPlatform(String),

    /// Any other driver failure during resolution.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// A resolved handle on an existing session plus its platform.
pub struct ExistingDriver {
    driver: Arc<dyn AutomationDriver>,
    platform: Platform,
    capabilities: Map<String, Value>,
}

impl std::fmt::Debug for ExistingDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistingDriver")
            .field("session_id", &self.driver.session_id())
            .field("platform", &self.platform)
            .finish()
    }
}

impl ExistingDriver {
    /// Resolve an existing session from `config`.
    ///
    /// Fails without retrying when the server is unreachable or no suitable
    /// session exists.
    pub async fn attach(config: &HarnessConfig) -> Result<Self, SessionError> {
        let span = info_span!("attach_session", server = %config.server_url);
        async {
            let client = WebDriverClient::new(&config.server_url, config.request_timeout())?;

            let session = match &config.session_id {
                Some(id) => fetch_session(&client, id).await?,
                None => discover_session(&client, &config.capabilities).await?,
            };

            let platform = classify(&session, config.platform)?;
            info!(session_id = %session.id, %platform, "attached to existing session");

            Ok::<Self, SessionError>(Self {
                driver: Arc::new(client.attach(session.id)),
                platform,
                capabilities: session.capabilities,
            })
        }
        .instrument(span)
        .await
    }

    /// Builds an accessor around an already-resolved driver.
    pub fn from_driver(driver: Arc<dyn AutomationDriver>, platform: Platform) -> Self {
        Self {
            driver,
            platform,
            capabilities: Map::new(),
        }
    }

    /// The raw session handle.
    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_ios_platform(&self) -> bool {
        self.platform.is_ios()
    }

    pub fn is_android_platform(&self) -> bool {
        self.platform.is_android()
    }

    /// Capabilities reported by the server for this session.
    pub fn capabilities(&self) -> &Map<String, Value> {
        &self.capabilities
    }

    /// Splits into the driver handle and platform.
    pub fn into_parts(self) -> (Arc<dyn AutomationDriver>, Platform) {
        (self.driver, self.platform)
    }
}

fn unreachable_or(client: &WebDriverClient, err: DriverError) -> SessionError {
    match err {
        DriverError::ConnectionLost(_) | DriverError::Timeout => SessionError::Unreachable {
            url: client.base_url().to_string(),
            source: err,
        },
        other => SessionError::Driver(other),
    }
}

async fn fetch_session(client: &WebDriverClient, id: &str) -> Result<SessionInfo, SessionError> {
    debug!(session_id = id, "fetching configured session");
    match client.session_capabilities(id).await {
        Ok(capabilities) => Ok(SessionInfo {
            id: id.to_string(),
            capabilities,
        }),
        Err(DriverError::InvalidSession(_)) => Err(SessionError::SessionNotFound(id.to_string())),
        Err(e) => Err(unreachable_or(client, e)),
    }
}

async fn discover_session(
    client: &WebDriverClient,
    desired: &Map<String, Value>,
) -> Result<SessionInfo, SessionError> {
    let sessions = client
        .list_sessions()
        .await
        .map_err(|e| unreachable_or(client, e))?;
    debug!(count = sessions.len(), "listed existing sessions");

    if sessions.is_empty() {
        return Err(SessionError::NoSessions(client.base_url().to_string()));
    }

    let count = sessions.len();
    sessions
        .into_iter()
        .find(|s| capabilities_match(&s.capabilities, desired))
        .ok_or(SessionError::NoMatchingSession { count })
}

/// Returns true if every desired capability is present in `actual`.
///
/// A desired key `k` matches `k` or the vendor-prefixed `appium:k`. Strings
/// compare case-insensitively; other JSON values compare exactly.
pub fn capabilities_match(actual: &Map<String, Value>, desired: &Map<String, Value>) -> bool {
    desired.iter().all(|(key, want)| {
        let have = actual
            .get(key)
            .or_else(|| actual.get(&format!("appium:{key}")))
            .or_else(|| key.strip_prefix("appium:").and_then(|bare| actual.get(bare)));
        match (have, want) {
            (Some(Value::String(a)), Value::String(b)) => a.eq_ignore_ascii_case(b),
            (Some(a), b) => a == b,
            (None, _) => false,
        }
    })
}

fn classify(session: &SessionInfo, hint: Option<Platform>) -> Result<Platform, SessionError> {
    match (Platform::from_capabilities(&session.capabilities), hint) {
        (Some(reported), Some(hinted)) if reported != hinted => {
            warn!(%reported, %hinted, "platform hint disagrees with session, using session");
            Ok(reported)
        }
        (Some(reported), _) => Ok(reported),
        (None, Some(hinted)) => Ok(hinted),
        (None, None) => Err(SessionError::UnknownPlatform(session.id.clone())),
    }
}
