//! Element references returned by the automation server.
//!
//! A WebDriver server identifies a located element by an opaque id. The
//! W3C protocol wraps it in an object keyed by a fixed UUID-like string;
//! older JSON Wire Protocol servers use the key `ELEMENT`.

use serde::{Deserialize, Serialize};

/// The W3C web element identifier key.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Wire representation of an element reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementRef {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf", alias = "ELEMENT")]
    pub id: String,
}

/// A located UI element.
///
/// Holds the server-side element id together with the accessibility
/// identifier it was found by, so errors and logs can name the element the
/// way the test did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Opaque id assigned by the automation server.
    pub id: String,
    /// The accessibility identifier used to locate the element.
    pub accessibility_id: String,
}

impl ElementHandle {
    pub fn new(id: impl Into<String>, accessibility_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            accessibility_id: accessibility_id.into(),
        }
    }
}
