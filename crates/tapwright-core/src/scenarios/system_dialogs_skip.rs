//! Dismisses the iOS system alert shown on first launch.
//!
//! On iOS the app under test opens behind a system dialog (e.g. the Firebase
//! configuration warning) whose confirm button has the accessibility id
//! `OK`. Android shows no such dialog.

use tracing::{info, warn};

use super::Outcome;
use crate::driver::DriverError;
use crate::error::HarnessError;
use crate::fixture::BaseTest;

/// Accessibility id of the dialog's confirm button.
pub const OK_BUTTON: &str = "OK";

/// Screenshot taken while the dialog is up.
pub const ENTER_SCREENSHOT: &str = "enter";

/// Screenshot taken after the dialog is handled.
pub const EXIT_SCREENSHOT: &str = "exit";

/// Wait for the dialog, capture the screen, and tap `OK`.
///
/// The `enter` screenshot is saved even when `OK` never shows up, so a
/// failed run still leaves a capture of what was on screen. After the tap
/// the dialog gets up to the settle timeout to go away; if an `OK` button is
/// still displayed after that (a chained alert, a slow animation) the step
/// still counts as completed.
///
/// Returns [`Outcome::Skipped`] on Android without touching the driver.
pub async fn enter(t: &BaseTest) -> Result<Outcome, HarnessError> {
    if t.is_android() {
        info!("no system dialog on Android, skipping");
        return Ok(Outcome::Skipped);
    }

    let waited = t.wait_for(OK_BUTTON).await;
    let saved = t.save_screenshot(ENTER_SCREENSHOT).await;
    let button = waited?;
    saved?;

    t.driver().click(&button).await?;
    match t.wait_until_gone(OK_BUTTON).await {
        Ok(()) => {}
        Err(DriverError::WaitTimeout { elapsed_ms, .. }) => {
            warn!(elapsed_ms, "'{OK_BUTTON}' still displayed after tap, continuing");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Outcome::Completed)
}

/// Capture the screen after the dialog step, on either platform.
pub async fn exit(t: &BaseTest) -> Result<Outcome, HarnessError> {
    t.save_screenshot(EXIT_SCREENSHOT).await?;
    Ok(Outcome::Completed)
}
