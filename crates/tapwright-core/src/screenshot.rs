//! Screenshot capture to deterministic file paths.
//!
//! A [`Screenshot`] is a logical name plus an output directory. Saving it
//! captures the current screen through an [`AutomationDriver`] and writes the
//! image to `<dir>/<name>.png`. Saving the same name again overwrites the
//! previous file.
//!
//! # Example
//!
//! ```no_run
//! use tapwright_core::driver::AutomationDriver;
//! use tapwright_core::screenshot::Screenshot;
//!
//! # async fn example(driver: &dyn AutomationDriver) -> Result<(), Box<dyn std::error::Error>> {
//! let path = Screenshot::new("enter")?.in_dir("artifacts").save(driver).await?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::DEFAULT_SCREENSHOT_DIR;
use crate::driver::{AutomationDriver, DriverError};

const EXTENSION: &str = "png";

/// Errors from capturing or persisting a screenshot.
#[derive(Error, Debug)]
pub enum ScreenshotError {
    /// The logical name cannot be turned into a file name.
    #[error("invalid screenshot name {0:?}")]
    InvalidName(String),

    /// The driver failed to capture the screen.
    #[error("screenshot capture failed: {0}")]
    Capture(#[from] DriverError),

    /// Writing the image to disk failed.
    #[error("writing screenshot to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A named screenshot destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    name: String,
    dir: PathBuf,
}

impl Screenshot {
    /// Create a screenshot named `name` in the default directory.
    ///
    /// The name must be non-empty, must not be `.` or `..`, and must not
    /// contain path separators.
    pub fn new(name: impl Into<String>) -> Result<Self, ScreenshotError> {
        let name = name.into();
        let invalid = name.trim().is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
            || name.contains('\0');
        if invalid {
            return Err(ScreenshotError::InvalidName(name));
        }
        Ok(Self {
            name,
            dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        })
    }

    /// Write into `dir` instead of the default directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file this screenshot is written to.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", self.name))
    }

    /// Capture the current screen and write it to [`path`](Self::path).
    ///
    /// Creates the output directory if needed. Returns the written path.
    pub async fn save(&self, driver: &dyn AutomationDriver) -> Result<PathBuf, ScreenshotError> {
        let data = driver.screenshot().await?;

        let path = self.path();
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ScreenshotError::Io {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|source| ScreenshotError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(bytes = data.len(), "screenshot written");
        info!(name = %self.name, path = %path.display(), "saved screenshot");
        Ok(path)
    }
}
