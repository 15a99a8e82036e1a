//! Per-test evidence trail: ordered steps, screenshots and attachments.
//!
//! An [`Evidence`] handle is created for each test execution and made
//! "current" for the task running that test via [`scope`]. The free functions
//! [`add_step`], [`attach`] and [`take_screenshot`] resolve the current handle
//! through a tokio task-local, so two tests running concurrently on different
//! tasks or threads never see each other's entries.
//!
//! Task-locals are not inherited by spawned tasks. Code that spawns work and
//! still wants to record into the same trail should pass the handle along
//! (`evidence::current()`) and re-enter it with [`scope`].
//!
//! # Example
//!
//! ```no_run
//! use mobitrail_core::evidence::{self, Evidence};
//!
//! # async fn example() {
//! let trail = Evidence::new("archive_list");
//! evidence::scope(trail.clone(), async {
//!     evidence::add_step("Opening Shopping Lists page");
//!     evidence::add_step("Creating new shopping list");
//! })
//! .await;
//! assert_eq!(trail.len(), 2);
//! # }
//! ```

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::session::Session;

tokio::task_local! {
    static CURRENT: Evidence;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Step,
    Screenshot,
    Attachment,
}

/// Body of an evidence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Payload {
    None,
    Text(String),
    /// PNG bytes; base64 in serialized form.
    Image(#[serde(with = "png_base64")] Vec<u8>),
}

/// One record in a test's evidence trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    /// 1-based position within the trail.
    pub sequence: u64,
    pub kind: EntryKind,
    pub label: String,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
    /// Session the entry was recorded against, if one was bound.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<Uuid>,
}

struct Trail {
    entries: Vec<EvidenceEntry>,
    session_id: Option<Uuid>,
}

struct Inner {
    id: Uuid,
    test_name: String,
    started_at: DateTime<Utc>,
    trail: Mutex<Trail>,
}

/// Handle to one test execution's append-only trail.
///
/// Cloning the handle shares the trail.
#[derive(Clone)]
pub struct Evidence {
    inner: Arc<Inner>,
}

impl Evidence {
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                test_name: test_name.into(),
                started_at: Utc::now(),
                trail: Mutex::new(Trail {
                    entries: Vec::new(),
                    session_id: None,
                }),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn test_name(&self) -> &str {
        &self.inner.test_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    // Entries must survive a panicking test, so a poisoned lock is recovered.
    fn trail(&self) -> MutexGuard<'_, Trail> {
        self.inner.trail.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(
        &self,
        kind: EntryKind,
        label: String,
        payload: Payload,
        session_id: Option<Uuid>,
    ) -> u64 {
        let mut trail = self.trail();
        let sequence = trail.entries.len() as u64 + 1;
        let session_id = session_id.or(trail.session_id);
        debug!(test = %self.inner.test_name, sequence, ?kind, label = %label, "evidence recorded");
        trail.entries.push(EvidenceEntry {
            sequence,
            kind,
            label,
            payload,
            timestamp: Utc::now(),
            session_id,
        });
        sequence
    }

    /// Append a step; returns its sequence number.
    pub fn add_step(&self, label: impl Into<String>) -> u64 {
        self.push(EntryKind::Step, label.into(), Payload::None, None)
    }

    /// Append a named text attachment.
    pub fn attach(&self, label: impl Into<String>, content: impl Into<String>) -> u64 {
        self.push(
            EntryKind::Attachment,
            label.into(),
            Payload::Text(content.into()),
            None,
        )
    }

    /// Append an already captured screenshot.
    pub fn record_screenshot(
        &self,
        label: impl Into<String>,
        png: Vec<u8>,
        session_id: Option<Uuid>,
    ) -> u64 {
        self.push(EntryKind::Screenshot, label.into(), Payload::Image(png), session_id)
    }

    /// Associate later entries with a session.
    pub fn bind_session(&self, session_id: Uuid) {
        self.trail().session_id = Some(session_id);
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.trail().session_id
    }

    /// Snapshot of the trail in insertion order.
    pub fn entries(&self) -> Vec<EvidenceEntry> {
        self.trail().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.trail().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels of all step entries, in order.
    pub fn step_labels(&self) -> Vec<String> {
        self.trail()
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Step)
            .map(|e| e.label.clone())
            .collect()
    }
}

impl std::fmt::Debug for Evidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evidence")
            .field("id", &self.inner.id)
            .field("test_name", &self.inner.test_name)
            .field("entries", &self.len())
            .finish()
    }
}

/// Run `fut` with `evidence` as the current trail.
pub async fn scope<F: Future>(evidence: Evidence, fut: F) -> F::Output {
    CURRENT.scope(evidence, fut).await
}

/// Synchronous counterpart of [`scope`].
pub fn sync_scope<R>(evidence: Evidence, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(evidence, f)
}

/// The trail of the test running on this task, if any.
pub fn current() -> Option<Evidence> {
    CURRENT.try_with(Evidence::clone).ok()
}

/// Record a step for the current test.
pub fn add_step(label: impl Into<String>) {
    let label = label.into();
    match current() {
        Some(evidence) => {
            evidence.add_step(label);
        }
        None => warn!(label = %label, "step recorded outside a test context"),
    }
}

/// Record a named text attachment for the current test.
pub fn attach(label: impl Into<String>, content: impl Into<String>) {
    let label = label.into();
    match current() {
        Some(evidence) => {
            evidence.attach(label, content);
        }
        None => warn!(label = %label, "attachment recorded outside a test context"),
    }
}

pub(crate) fn bind_session(session_id: Uuid) {
    if let Some(evidence) = current() {
        evidence.bind_session(session_id);
    }
}

/// Capture the screen of `session` into the current test's trail.
///
/// Never fails: an unsupported capture, a closed session or a missing test
/// context is logged and otherwise ignored.
pub async fn take_screenshot(session: &Session, label: impl Into<String>) {
    let label = label.into();
    let Some(evidence) = current() else {
        warn!(label = %label, "screenshot requested outside a test context");
        return;
    };
    let driver = match session.driver() {
        Ok(driver) => driver,
        Err(e) => {
            warn!(label = %label, error = %e, "screenshot skipped");
            return;
        }
    };
    match driver.screenshot().await {
        Ok(png) => {
            evidence.record_screenshot(label, png, Some(session.id()));
        }
        Err(e) => warn!(label = %label, error = %e, "screenshot capture failed"),
    }
}

mod png_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
