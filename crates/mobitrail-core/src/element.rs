//! Locator and element-reference types shared by every automation backend.
//!
//! A [`Locator`] describes *how* to find an element on the remote device; an
//! [`ElementRef`] is the opaque handle the remote automation server returns
//! once it has found one. Neither type knows anything about the wire protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A platform-specific element lookup strategy and its query.
///
/// Serialized with a `using`/`value` pair, matching the shape the W3C
/// WebDriver "find element" command expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "using", content = "value")]
pub enum Locator {
    /// Accessibility identifier (`content-desc` on Android, `accessibilityIdentifier` on iOS).
    #[serde(rename = "accessibility id")]
    AccessibilityId(String),

    /// Structural XPath-style query over the UI hierarchy.
    #[serde(rename = "xpath")]
    XPath(String),

    /// Platform resource identifier (e.g. `com.example:id/title`).
    #[serde(rename = "id")]
    Id(String),

    /// Native widget class name (e.g. `android.widget.EditText`).
    #[serde(rename = "class name")]
    ClassName(String),
}

impl Locator {
    /// Shorthand for [`Locator::AccessibilityId`].
    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Locator::AccessibilityId(value.into())
    }

    /// Shorthand for [`Locator::XPath`].
    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    /// Shorthand for [`Locator::Id`].
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    /// Shorthand for [`Locator::ClassName`].
    pub fn class_name(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    /// The W3C strategy name sent to the server.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::AccessibilityId(_) => "accessibility id",
            Locator::XPath(_) => "xpath",
            Locator::Id(_) => "id",
            Locator::ClassName(_) => "class name",
        }
    }

    /// The raw query string.
    pub fn value(&self) -> &str {
        match self {
            Locator::AccessibilityId(v)
            | Locator::XPath(v)
            | Locator::Id(v)
            | Locator::ClassName(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Opaque handle to an element that the remote server has located.
///
/// The handle is only meaningful to the session that produced it; once the
/// element leaves the hierarchy the server reports it as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
