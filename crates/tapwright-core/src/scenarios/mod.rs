//! Reusable UI scripts built on [`BaseTest`](crate::fixture::BaseTest).
//!
//! Each scenario is a plain async function over a ready fixture, so the same
//! script runs from `#[tokio::test]` against a device, from the CLI, or
//! against a mock driver.

pub mod system_dialogs_skip;

/// How a scenario step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The step ran to completion.
    Completed,
    /// The step does not apply to the session's platform.
    Skipped,
}
