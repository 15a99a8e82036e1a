//! Report sinks that receive a test's evidence trail when it finishes.
//!
//! A [`TestReport`] bundles the ordered evidence of one test execution with
//! its final [`TestStatus`]. Reports are published to a [`ReportSink`]:
//!
//! - [`JsonlReportSink`] writes one JSON Lines file per report (a header line
//!   followed by one line per entry).
//! - [`MemoryReportSink`] keeps reports in memory for in-process consumers.
//!
//! Publishing never fails from the caller's point of view; sinks log their
//! own I/O errors.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::evidence::{EntryKind, Evidence, EvidenceEntry};

/// How a test execution ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    /// The body returned an error.
    Failed { category: FailureCategory, message: String },
    /// The body panicked (assertion failure) or was cancelled.
    Broken { message: String },
}

/// Separates "the UI never reached the state" from other failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    ConditionTimeout,
    Action,
    Session,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub test_name: String,
    pub execution_id: Uuid,
    pub status: TestStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<Uuid>,
    pub entries: Vec<EvidenceEntry>,
}

impl TestReport {
    /// Freeze `evidence` into a report.
    pub fn from_evidence(evidence: &Evidence, status: TestStatus) -> Self {
        Self {
            test_name: evidence.test_name().to_string(),
            execution_id: evidence.id(),
            status,
            started_at: evidence.started_at(),
            finished_at: Utc::now(),
            session_id: evidence.session_id(),
            entries: evidence.entries(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }

    pub fn step_labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Step)
            .map(|e| e.label.as_str())
            .collect()
    }

    pub fn screenshot_labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Screenshot)
            .map(|e| e.label.as_str())
            .collect()
    }
}

/// Destination for finished test reports.
pub trait ReportSink: Send + Sync {
    fn publish(&self, report: &TestReport);
}

#[derive(Serialize)]
struct ReportHeader<'a> {
    test_name: &'a str,
    execution_id: Uuid,
    #[serde(flatten)]
    status: &'a TestStatus,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<Uuid>,
    entry_count: usize,
}

/// Writes each report to `<dir>/<test>_<timestamp>_<id>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlReportSink {
    dir: PathBuf,
}

impl JsonlReportSink {
    /// The directory is created on first publish if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path a report is written to.
    pub fn path_for(&self, report: &TestReport) -> PathBuf {
        let name: String = report
            .test_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let timestamp = report.started_at.format("%Y%m%d_%H%M%S");
        let short_id: String = report
            .execution_id
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();
        self.dir
            .join(format!("{}_{}_{}.jsonl", name, timestamp, short_id))
    }

    fn write(&self, report: &TestReport) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(report);
        let mut writer = BufWriter::new(File::create(&path)?);
        let header = ReportHeader {
            test_name: &report.test_name,
            execution_id: report.execution_id,
            status: &report.status,
            started_at: report.started_at,
            finished_at: report.finished_at,
            session_id: report.session_id,
            entry_count: report.entries.len(),
        };
        serde_json::to_writer(&mut writer, &header)?;
        writeln!(writer)?;
        for entry in &report.entries {
            serde_json::to_writer(&mut writer, entry)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(path)
    }
}

impl ReportSink for JsonlReportSink {
    fn publish(&self, report: &TestReport) {
        match self.write(report) {
            Ok(path) => debug!(test = %report.test_name, path = %path.display(), "report written"),
            Err(e) => warn!(test = %report.test_name, error = %e, "failed to write report"),
        }
    }
}

/// Collects reports in memory.
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    reports: Mutex<Vec<TestReport>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports, in publish order.
    pub fn reports(&self) -> Vec<TestReport> {
        self.reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Most recent report for `test_name`.
    pub fn report(&self, test_name: &str) -> Option<TestReport> {
        self.reports()
            .into_iter()
            .rev()
            .find(|r| r.test_name == test_name)
    }
}

impl ReportSink for MemoryReportSink {
    fn publish(&self, report: &TestReport) {
        self.reports
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(report.clone());
    }
}
