//! Remote automation client traits.
//!
//! The harness does not speak the remote automation wire protocol itself.
//! Instead it talks to whatever client the caller plugs in through two traits:
//!
//! - [`SessionConnector`] creates a remote session from a capability map.
//! - [`RemoteDriver`] is the live session: element lookup, attribute reads,
//!   action dispatch, screen capture and teardown.
//!
//! Backends map their own failures onto [`DriverError`]. The wait primitive
//! relies on that mapping: [`DriverError::NoSuchElement`] and
//! [`DriverError::StaleElement`] are treated as transient and retried, every
//! other variant aborts the wait.
//!
//! # Example
//!
//! ```no_run
//! use mobitrail_core::driver::RemoteDriver;
//! use mobitrail_core::element::Locator;
//!
//! # async fn example(driver: &dyn RemoteDriver) -> Result<(), mobitrail_core::driver::DriverError> {
//! let banner = driver.find_element(&Locator::accessibility_id("Saved")).await?;
//! if driver.is_displayed(&banner).await? {
//!     let text = driver.attribute(&banner, "content-desc").await?;
//!     println!("banner says {:?}", text);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::element::{ElementRef, Locator};

/// W3C capability object sent when creating a session.
pub type CapabilityMap = serde_json::Map<String, serde_json::Value>;

/// Errors reported by a [`RemoteDriver`] backend.
#[derive(Error, Debug)]
pub enum DriverError {
    /// No element matched the locator (yet).
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// The element handle no longer refers to an attached element.
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// The session has already been closed; no command may be dispatched.
    #[error("Session is closed")]
    SessionClosed,

    /// The backend does not implement this command.
    #[error("Unsupported command: {0}")]
    Unsupported(String),

    /// The server rejected or failed the command.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The channel to the server was lost.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The server did not answer in time.
    #[error("Operation timed out")]
    Timeout,
}

impl DriverError {
    /// Returns true for lookup failures that are expected while the UI settles.
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::NoSuchElement(_) | DriverError::StaleElement(_))
    }
}

/// Errors reported by a [`SessionConnector`] when creating a session.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// The server could not be reached at all.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The server answered but refused the capability set.
    #[error("capabilities rejected: {0}")]
    Rejected(String),
}

/// Creates remote automation sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Request a new session on `server_url` with the given capabilities.
    async fn connect(
        &self,
        server_url: &Url,
        capabilities: &CapabilityMap,
    ) -> Result<Box<dyn RemoteDriver>, ConnectError>;
}

/// A live remote automation session.
///
/// The underlying channel is not assumed to tolerate concurrent use, so the
/// harness only ever issues one command at a time per session. Implementors
/// still need `Send + Sync` so a session can move between worker threads.
#[async_trait]
pub trait RemoteDriver: Send + Sync {
    /// Server-assigned session identifier.
    fn session_id(&self) -> &str;

    /// Locate the first element matching `locator`.
    ///
    /// Returns [`DriverError::NoSuchElement`] when nothing matches.
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError>;

    /// Locate every element matching `locator`, in document order.
    ///
    /// An empty result is not an error.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError>;

    /// Whether the element is currently rendered and visible.
    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError>;

    /// Read a named attribute such as `content-desc` or `text`.
    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Tap the element.
    async fn click(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// Type text into the element.
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    /// Clear an editable element.
    async fn clear(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// Swipe between two screen points. `duration_ms` is the gesture length.
    ///
    /// The default implementation reports the command as unsupported.
    async fn swipe(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        let _ = (start, end, duration_ms);
        Err(DriverError::Unsupported("swipe".to_string()))
    }

    /// Capture the full screen as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// End the remote session.
    async fn quit(&self) -> Result<(), DriverError>;
}
