//! Automation driver trait for backend-agnostic UI automation.
//!
//! This module defines the [`AutomationDriver`] trait, the handle a test holds
//! on an existing automation session. The production implementation is
//! [`WebDriverSession`](crate::webdriver::WebDriverSession), which speaks the
//! W3C WebDriver wire format to an Appium server. Tests substitute their own
//! implementations to exercise fixtures and scenarios without a device.
//!
//! # Example
//!
//! ```no_run
//! use tapwright_core::driver::AutomationDriver;
//!
//! # async fn example(driver: &dyn AutomationDriver) -> Result<(), Box<dyn std::error::Error>> {
//! let button = driver.find_element("OK").await?;
//! driver.click(&button).await?;
//! let png = driver.screenshot().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::element::ElementHandle;

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type,
/// allowing consumers to handle errors uniformly regardless of the
/// underlying automation backend.
#[derive(Error, Debug)]
pub enum DriverError {
    /// No element matched the locator.
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// The element reference is no longer attached to the UI.
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// The session id is unknown to the server or the session has ended.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The server could not be reached or dropped the connection.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A single request to the server timed out.
    #[error("Operation timed out")]
    Timeout,

    /// An explicit wait gave up.
    #[error("Timeout after {elapsed_ms}ms waiting for {condition}")]
    WaitTimeout {
        /// What was being waited for, e.g. `element 'OK' to be interactable`.
        condition: String,
        elapsed_ms: u64,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// A payload could not be decoded (e.g. invalid base64 screenshot).
    #[error("Decode error: {0}")]
    Decode(String),
}

impl DriverError {
    /// Returns true for errors an explicit wait should poll through.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::NoSuchElement(_) | DriverError::StaleElement(_)
        )
    }
}

/// Trait for a handle on a live automation session.
///
/// All methods that talk to the device are async. Implementations must be
/// shareable across tasks, so the fixture can hold them in an `Arc`.
///
/// # Required Methods
///
/// Implementors must provide: [`session_id`](AutomationDriver::session_id),
/// [`find_element`](AutomationDriver::find_element),
/// [`click`](AutomationDriver::click),
/// [`is_displayed`](AutomationDriver::is_displayed),
/// [`is_enabled`](AutomationDriver::is_enabled),
/// and [`screenshot`](AutomationDriver::screenshot).
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// The id of the session this handle is attached to.
    fn session_id(&self) -> &str;

    /// Find an element by its accessibility identifier.
    ///
    /// Returns [`DriverError::NoSuchElement`] when nothing matches. There is
    /// no retry; use [`crate::wait`] for polling.
    async fn find_element(&self, accessibility_id: &str) -> Result<ElementHandle, DriverError>;

    /// Tap/click a previously located element.
    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Whether the element is currently visible on screen.
    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Whether the element currently accepts interaction.
    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Capture a screenshot of the current screen.
    ///
    /// # Returns
    ///
    /// Raw image bytes (PNG for every server this crate has been used with).
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Find an element by accessibility identifier and click it.
    ///
    /// The default implementation is [`find_element`](Self::find_element)
    /// followed by [`click`](Self::click).
    async fn tap_element(&self, accessibility_id: &str) -> Result<(), DriverError> {
        let element = self.find_element(accessibility_id).await?;
        self.click(&element).await
    }
}
