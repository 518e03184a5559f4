//! Explicit waits: poll the driver until a UI condition holds or a deadline
//! passes.
//!
//! These replace fixed-duration sleeps. A wait returns as soon as its
//! condition is met and fails with [`DriverError::WaitTimeout`] once the
//! timeout elapses. Lookup misses ([`DriverError::is_retryable`]) are polled
//! through; any other driver error ends the wait immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info_span, trace, Instrument};

use crate::config::WaitConfig;
use crate::driver::{AutomationDriver, DriverError};
use crate::element::ElementHandle;

/// Poll interval and timeout for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Same poll interval, different timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitConfig::default().into()
    }
}

impl From<WaitConfig> for WaitOptions {
    fn from(config: WaitConfig) -> Self {
        Self::new(config.timeout(), config.poll_interval())
    }
}

impl From<&WaitConfig> for WaitOptions {
    fn from(config: &WaitConfig) -> Self {
        Self::new(config.timeout(), config.poll_interval())
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Runs one poll attempt, cut off at `deadline`.
///
/// Returns `None` when the deadline passes before the driver answers. The
/// attempt is always polled at least once, so an immediate answer at the
/// deadline still counts.
async fn attempt_until<T, F>(deadline: Instant, attempt: F) -> Option<Result<T, DriverError>>
where
    F: Future<Output = Result<T, DriverError>>,
{
    tokio::time::timeout(deadline.saturating_duration_since(Instant::now()), attempt)
        .await
        .ok()
}

/// Sleeps one poll interval, but never past `deadline`.
async fn pause(deadline: Instant, poll_interval: Duration) {
    tokio::time::sleep_until(deadline.min(Instant::now() + poll_interval)).await;
}

/// Checks whether `element` is displayed and enabled.
async fn is_interactable(
    driver: &dyn AutomationDriver,
    element: &ElementHandle,
) -> Result<bool, DriverError> {
    Ok(driver.is_displayed(element).await? && driver.is_enabled(element).await?)
}

/// Wait until the element with `accessibility_id` exists, is displayed and
/// is enabled, then return it.
///
/// The timeout bounds the whole wait, including a driver call that hangs.
pub async fn wait_for_element(
    driver: &dyn AutomationDriver,
    accessibility_id: &str,
    options: WaitOptions,
) -> Result<ElementHandle, DriverError> {
    let span = info_span!("wait_for_element", accessibility_id, timeout_ms = options.timeout.as_millis() as u64);
    async {
        let start = Instant::now();
        let deadline = start + options.timeout;
        let timed_out = || DriverError::WaitTimeout {
            condition: format!("element '{accessibility_id}' to be interactable"),
            elapsed_ms: elapsed_ms(start),
        };

        loop {
            let attempt = async {
                let element = driver.find_element(accessibility_id).await?;
                let ready = is_interactable(driver, &element).await?;
                Ok::<_, DriverError>(ready.then_some(element))
            };

            match attempt_until(deadline, attempt).await {
                Some(Ok(Some(element))) => {
                    debug!(elapsed_ms = elapsed_ms(start), "element interactable");
                    return Ok(element);
                }
                Some(Ok(None)) => trace!("element present but not interactable"),
                Some(Err(e)) if e.is_retryable() => trace!(error = %e, "element not ready"),
                Some(Err(e)) => return Err(e),
                None => {
                    debug!("driver call outlived the wait");
                    return Err(timed_out());
                }
            }

            if Instant::now() >= deadline {
                return Err(timed_out());
            }
            pause(deadline, options.poll_interval).await;
        }
    }
    .instrument(span)
    .await
}

/// Wait until no displayed element with `accessibility_id` remains.
///
/// The timeout bounds the whole wait, including a driver call that hangs.
pub async fn wait_for_absent(
    driver: &dyn AutomationDriver,
    accessibility_id: &str,
    options: WaitOptions,
) -> Result<(), DriverError> {
    let span = info_span!("wait_for_absent", accessibility_id, timeout_ms = options.timeout.as_millis() as u64);
    async {
        let start = Instant::now();
        let deadline = start + options.timeout;
        let timed_out = || DriverError::WaitTimeout {
            condition: format!("element '{accessibility_id}' to disappear"),
            elapsed_ms: elapsed_ms(start),
        };

        loop {
            let attempt = async {
                match driver.find_element(accessibility_id).await {
                    Ok(element) => match driver.is_displayed(&element).await {
                        Ok(displayed) => Ok(displayed),
                        Err(e) if e.is_retryable() => Ok(false),
                        Err(e) => Err(e),
                    },
                    Err(e) if e.is_retryable() => Ok(false),
                    Err(e) => Err(e),
                }
            };

            match attempt_until(deadline, attempt).await {
                Some(Ok(false)) => {
                    debug!(elapsed_ms = elapsed_ms(start), "element gone");
                    return Ok(());
                }
                Some(Ok(true)) => trace!("element still displayed"),
                Some(Err(e)) => return Err(e),
                None => {
                    debug!("driver call outlived the wait");
                    return Err(timed_out());
                }
            }

            if Instant::now() >= deadline {
                return Err(timed_out());
            }
            pause(deadline, options.poll_interval).await;
        }
    }
    .instrument(span)
    .await
}
