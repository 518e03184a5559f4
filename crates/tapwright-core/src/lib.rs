//! # tapwright-core
//!
//! Core library for driving already-running Appium sessions from Rust tests.
//!
//! The crate attaches to an existing WebDriver session, works out whether it
//! targets iOS or Android, and gives tests a small fixture for tapping
//! elements by accessibility identifier, waiting for UI readiness, and saving
//! screenshots.
//!
//! ## Modules
//!
//! - [`config`] - Explicit harness configuration (`~/.tapwright/config.json`)
//! - [`platform`] - iOS / Android classification
//! - [`webdriver`] - HTTP client for the W3C WebDriver wire format
//! - [`driver`] - Backend-agnostic [`AutomationDriver`](driver::AutomationDriver) trait
//! - [`existing_driver`] - Session discovery and attachment
//! - [`wait`] - Bounded polling waits
//! - [`screenshot`] - Screenshot capture to named files
//! - [`fixture`] - Per-test [`BaseTest`](fixture::BaseTest) fixture
//! - [`scenarios`] - Reusable UI scripts
//!
//! ## External Dependencies
//!
//! An Appium server with at least one live session. Session creation is left
//! to whatever launches the app (Appium Inspector, a CI step, etc.).
//!
//! ## Example
//!
//! ```no_run
//! use tapwright_core::config::HarnessConfig;
//! use tapwright_core::fixture::BaseTest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let t = BaseTest::setup(&HarnessConfig::default()).await?;
//!     println!("attached to {} session", t.platform());
//!     t.save_screenshot("start").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod existing_driver;
pub mod fixture;
pub mod platform;
pub mod scenarios;
pub mod screenshot;
pub mod wait;
pub mod webdriver;
