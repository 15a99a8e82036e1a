//! Remote session lifecycle.
//!
//! A [`Session`] wraps one live connection to a remote automation endpoint
//! and moves through [`LifecycleState::Created`] → [`LifecycleState::Active`]
//! → [`LifecycleState::Closed`], never backwards. Once closed, every attempt
//! to reach the driver fails with [`DriverError::SessionClosed`].
//!
//! [`SessionManager`] owns the session for one test class. It is a plain
//! value, not a global: parallel test classes each hold their own manager.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitrail_core::capabilities::{Capabilities, EnvSource};
//! use mobitrail_core::driver::SessionConnector;
//! use mobitrail_core::session::SessionManager;
//!
//! # async fn example(connector: Arc<dyn SessionConnector>) -> Result<(), Box<dyn std::error::Error>> {
//! let caps = Capabilities::from_source(&EnvSource::default())?;
//! let mut manager = SessionManager::new(connector, std::env::current_dir()?);
//! let session = manager.open(caps).await?;
//! println!("session {} on {}", session.id(), session.capabilities().device_name);
//! manager.close().await;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::driver::{ConnectError, DriverError, RemoteDriver, SessionConnector};
use crate::evidence;

/// Failure to obtain a session. Fatal to the whole test class.
#[derive(Error, Debug)]
pub enum SessionCreationError {
    #[error("malformed server URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("unsupported URL scheme '{scheme}' in '{url}' (expected http or https)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("automation server at {url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("automation server rejected the capability set: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Created,
    Active,
    Closed,
}

/// One live connection to a remote automation endpoint.
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    capabilities: Capabilities,
    state: LifecycleState,
    driver: Option<Box<dyn RemoteDriver>>,
}

/// Parse and validate the endpoint URL before anything is sent.
pub fn parse_server_url(raw: &str) -> Result<Url, SessionCreationError> {
    let url = Url::parse(raw).map_err(|e| SessionCreationError::MalformedUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(SessionCreationError::UnsupportedScheme {
                url: raw.to_string(),
                scheme: other.to_string(),
            })
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(SessionCreationError::MalformedUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

impl Session {
    /// Open a session with the full capability set.
    ///
    /// The server URL is validated first; a malformed URL fails before the
    /// connector is contacted. On success the session is bound to the current
    /// evidence context and a "session started" step is recorded.
    pub async fn open(
        capabilities: Capabilities,
        connector: &dyn SessionConnector,
        workdir: &std::path::Path,
    ) -> Result<Self, SessionCreationError> {
        let url = parse_server_url(&capabilities.server_url)?;
        let mut session = Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            capabilities,
            state: LifecycleState::Created,
            driver: None,
        };
        let capability_map = session.capabilities.to_capability_map(workdir);
        debug!(session = %session.id, %url, "requesting remote session");

        let driver = connector
            .connect(&url, &capability_map)
            .await
            .map_err(|e| match e {
                ConnectError::Unreachable(reason) => SessionCreationError::Unreachable {
                    url: url.to_string(),
                    reason,
                },
                ConnectError::Rejected(reason) => SessionCreationError::Rejected(reason),
            })?;

        info!(
            session = %session.id,
            remote_id = driver.session_id(),
            device = %session.capabilities.device_name,
            "session started"
        );
        session.driver = Some(driver);
        session.state = LifecycleState::Active;

        evidence::bind_session(session.id);
        evidence::add_step(format!(
            "session started on {}",
            session.capabilities.device_name
        ));
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Server-assigned identifier, while the session is active.
    pub fn remote_id(&self) -> Option<&str> {
        self.driver.as_deref().map(|d| d.session_id())
    }

    /// The live driver, or [`DriverError::SessionClosed`] once closed.
    pub fn driver(&self) -> Result<&dyn RemoteDriver, DriverError> {
        match (&self.state, &self.driver) {
            (LifecycleState::Active, Some(driver)) => Ok(&**driver),
            _ => Err(DriverError::SessionClosed),
        }
    }

    /// Tear the session down. Closing twice is a no-op.
    ///
    /// A step is recorded before the remote teardown. Teardown failures are
    /// logged and swallowed.
    pub async fn close(&mut self) {
        let Some(driver) = self.driver.take() else {
            self.state = LifecycleState::Closed;
            return;
        };
        evidence::add_step("Closing application");
        match driver.quit().await {
            Ok(()) => info!(session = %self.id, "session closed"),
            Err(e) => warn!(session = %self.id, error = %e, "remote teardown failed"),
        }
        self.state = LifecycleState::Closed;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        warn!(session = %self.id, "session dropped while active; quitting in background");
        self.state = LifecycleState::Closed;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let id = self.id;
                handle.spawn(async move {
                    if let Err(e) = driver.quit().await {
                        warn!(session = %id, error = %e, "background teardown failed");
                    }
                });
            }
            Err(_) => warn!(session = %self.id, "no runtime available; remote session leaked"),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .field("driver", &self.remote_id())
            .finish()
    }
}

/// Owns the session of one test class.
pub struct SessionManager {
    connector: Arc<dyn SessionConnector>,
    workdir: PathBuf,
    session: Option<Session>,
}

impl SessionManager {
    /// `workdir` is the root that relative app paths resolve against.
    pub fn new(connector: Arc<dyn SessionConnector>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            workdir: workdir.into(),
            session: None,
        }
    }

    /// Open the class session, closing any previous one first.
    pub async fn open(
        &mut self,
        capabilities: Capabilities,
    ) -> Result<&Session, SessionCreationError> {
        if let Some(mut previous) = self.session.take() {
            warn!(session = %previous.id(), "replacing an open session");
            previous.close().await;
        }
        let session = Session::open(capabilities, self.connector.as_ref(), &self.workdir).await?;
        Ok(self.session.insert(session))
    }

    /// The live session handle, if one was opened.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Close the class session. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.close().await;
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("workdir", &self.workdir)
            .field("session", &self.session)
            .finish()
    }
}
