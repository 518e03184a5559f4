//! Mobile platform classification.
//!
//! A session targets exactly one of two platforms. [`Platform`] is a closed
//! enumeration so that "both" and "neither" are unrepresentable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The mobile platform an automation session targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Apple iOS (XCUITest driver).
    Ios,
    /// Google Android (UiAutomator2 / Espresso drivers).
    Android,
}

/// Returned when a string does not name a supported platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported platform: {0}")]
pub struct UnknownPlatform(pub String);

impl Platform {
    pub fn is_ios(self) -> bool {
        matches!(self, Platform::Ios)
    }

    pub fn is_android(self) -> bool {
        matches!(self, Platform::Android)
    }

    /// Reads the platform from a session's capabilities.
    ///
    /// Looks at `platformName` first, then the vendor-prefixed
    /// `appium:platformName`. Returns `None` when neither is present or the
    /// value is not a recognised platform.
    pub fn from_capabilities(caps: &Map<String, Value>) -> Option<Platform> {
        ["platformName", "appium:platformName"]
            .iter()
            .filter_map(|key| caps.get(*key).and_then(Value::as_str))
            .find_map(|name| name.parse().ok())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Ios => write!(f, "iOS"),
            Platform::Android => write!(f, "Android"),
        }
    }
}
