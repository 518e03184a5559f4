//! Per-test fixture for driving an existing session.
//!
//! [`BaseTest::setup`] resolves the existing session and its platform once;
//! the returned value is the fixture's "ready" state for the duration of one
//! test. There is no "uninitialized" value to misuse, and no teardown: the
//! session belongs to whoever started it.
//!
//! # Example
//!
//! ```no_run
//! use tapwright_core::config::HarnessConfig;
//! use tapwright_core::fixture::BaseTest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let t = BaseTest::setup(&HarnessConfig::load()).await?;
//! if t.is_ios() {
//!     t.tap("OK").await?;
//! }
//! t.save_screenshot("after-ok").await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{HarnessConfig, WaitConfig};
use crate::driver::{AutomationDriver, DriverError};
use crate::element::ElementHandle;
use crate::existing_driver::{ExistingDriver, SessionError};
use crate::platform::Platform;
use crate::screenshot::{Screenshot, ScreenshotError};
use crate::wait::{self, WaitOptions};

/// Test-scoped handle: driver, platform and output settings.
pub struct BaseTest {
    driver: Arc<dyn AutomationDriver>,
    platform: Platform,
    screenshot_dir: PathBuf,
    wait: WaitConfig,
}

impl BaseTest {
    /// Attach to the existing session described by `config`.
    ///
    /// Fails before any test body runs if no session can be resolved.
    pub async fn setup(config: &HarnessConfig) -> Result<Self, SessionError> {
        let existing = ExistingDriver::attach(config).await?;
        let (driver, platform) = existing.into_parts();
        Ok(Self::from_parts(driver, platform, config))
    }

    /// Build the fixture around an already-resolved driver.
    pub fn from_parts(
        driver: Arc<dyn AutomationDriver>,
        platform: Platform,
        config: &HarnessConfig,
    ) -> Self {
        debug!(session_id = driver.session_id(), %platform, "fixture ready");
        Self {
            driver,
            platform,
            screenshot_dir: config.screenshot_dir.clone(),
            wait: config.wait.clone(),
        }
    }

    pub fn driver(&self) -> &dyn AutomationDriver {
        self.driver.as_ref()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_ios(&self) -> bool {
        self.platform.is_ios()
    }

    pub fn is_android(&self) -> bool {
        self.platform.is_android()
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    pub fn wait_config(&self) -> &WaitConfig {
        &self.wait
    }

    /// Capture the screen to `<screenshot_dir>/<name>.png`.
    pub async fn save_screenshot(&self, name: &str) -> Result<PathBuf, ScreenshotError> {
        Screenshot::new(name)?
            .in_dir(&self.screenshot_dir)
            .save(self.driver())
            .await
    }

    /// Wait for an element to become interactable using the configured timeout.
    pub async fn wait_for(&self, accessibility_id: &str) -> Result<ElementHandle, DriverError> {
        wait::wait_for_element(self.driver(), accessibility_id, WaitOptions::from(&self.wait)).await
    }

    /// Wait for an element to disappear using the configured settle timeout.
    pub async fn wait_until_gone(&self, accessibility_id: &str) -> Result<(), DriverError> {
        let options = WaitOptions::from(&self.wait).with_timeout(self.wait.settle_timeout());
        wait::wait_for_absent(self.driver(), accessibility_id, options).await
    }

    /// Wait for an element, then click it.
    pub async fn tap(&self, accessibility_id: &str) -> Result<(), DriverError> {
        let element = self.wait_for(accessibility_id).await?;
        self.driver.click(&element).await
    }
}
