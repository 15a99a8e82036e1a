//! Test-class fixture tying session, evidence and reporting together.
//!
//! A [`TestClass`] is what one worker holds while it runs a group of tests
//! against a single remote session:
//!
//! 1. [`TestClass::setup`] records device metadata and opens the session
//!    inside a `<class>::setup` evidence context.
//! 2. [`TestClass::run`] executes one test body inside its own evidence
//!    context and publishes a [`TestReport`] when the body finishes, fails or
//!    panics.
//! 3. [`TestClass::teardown`] closes the session inside a
//!    `<class>::teardown` context. It never fails.
//!
//! Nothing here is global; two classes on two workers share no state besides
//! the report sink they were handed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitrail_core::capabilities::{Capabilities, EnvSource};
//! use mobitrail_core::config::HarnessConfig;
//! use mobitrail_core::driver::SessionConnector;
//! use mobitrail_core::evidence;
//! use mobitrail_core::harness::TestClass;
//! use mobitrail_core::report::JsonlReportSink;
//!
//! # async fn example(connector: Arc<dyn SessionConnector>) -> Result<(), mobitrail_core::error::HarnessError> {
//! let config = HarnessConfig::load();
//! let sink = Arc::new(JsonlReportSink::new(config.report_dir()));
//! let caps = Capabilities::from_source(&EnvSource::default())?;
//! let class = TestClass::setup("Scenarios", caps, connector, sink, config).await?;
//!
//! class
//!     .run("smoke", |session| async move {
//!         evidence::add_step("App is up");
//!         evidence::take_screenshot(session, "Home").await;
//!         Ok(())
//!     })
//!     .await?;
//!
//! class.teardown().await;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use crate::capabilities::Capabilities;
use crate::config::HarnessConfig;
use crate::driver::{DriverError, SessionConnector};
use crate::error::HarnessError;
use crate::evidence::{self, Evidence};
use crate::report::{ReportSink, TestReport, TestStatus};
use crate::session::{Session, SessionManager};
use crate::wait::Wait;

/// Publishes a trail exactly once, even if the test body is dropped mid-flight.
struct ReportGuard {
    evidence: Evidence,
    sink: Arc<dyn ReportSink>,
    published: bool,
}

impl ReportGuard {
    fn new(evidence: Evidence, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            evidence,
            sink,
            published: false,
        }
    }

    fn publish(&mut self, status: TestStatus) {
        if self.published {
            return;
        }
        self.published = true;
        let report = TestReport::from_evidence(&self.evidence, status);
        self.sink.publish(&report);
    }

    fn finish(mut self, status: TestStatus) {
        self.publish(status);
    }
}

impl Drop for ReportGuard {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        let message = if std::thread::panicking() {
            "test panicked"
        } else {
            "test cancelled"
        };
        warn!(test = %self.evidence.test_name(), message, "publishing partial evidence");
        self.publish(TestStatus::Broken {
            message: message.to_string(),
        });
    }
}

/// Text of a panic payload; `panic!` and failed assertions carry a `&str` or a `String`.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked".to_string()
    }
}

fn failed(err: &HarnessError) -> TestStatus {
    TestStatus::Failed {
        category: err.category(),
        message: err.to_string(),
    }
}

/// One test class: a session plus the tests run against it.
pub struct TestClass {
    name: String,
    manager: SessionManager,
    sink: Arc<dyn ReportSink>,
    config: HarnessConfig,
}

impl TestClass {
    /// Open the class session.
    ///
    /// Device, platform and platform version are attached to the setup trail
    /// before the session is requested. A creation failure is returned as
    /// [`HarnessError::Session`] after the setup trail has been published as
    /// broken.
    pub async fn setup(
        name: impl Into<String>,
        capabilities: Capabilities,
        connector: Arc<dyn SessionConnector>,
        sink: Arc<dyn ReportSink>,
        config: HarnessConfig,
    ) -> Result<Self, HarnessError> {
        let name = name.into();
        let mut manager = SessionManager::new(connector, config.workdir());
        let trail = Evidence::new(format!("{}::setup", name));
        let guard = ReportGuard::new(trail.clone(), sink.clone());

        let opened = evidence::scope(trail, async {
            evidence::attach("Device", capabilities.device_name.as_str());
            evidence::attach("Platform", capabilities.platform_name.as_str());
            evidence::attach("Platform Version", capabilities.platform_version.as_str());
            manager.open(capabilities).await.map(|_| ())
        })
        .await;

        match opened {
            Ok(()) => {
                guard.finish(TestStatus::Passed);
                info!(class = %name, "test class ready");
                Ok(Self {
                    name,
                    manager,
                    sink,
                    config,
                })
            }
            Err(e) => {
                let err = HarnessError::from(e);
                guard.finish(TestStatus::Broken {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Default wait for page objects in this class.
    pub fn wait(&self) -> Wait {
        self.config.wait()
    }

    /// The live class session.
    pub fn session(&self) -> Result<&Session, HarnessError> {
        self.manager
            .session()
            .filter(|s| s.is_active())
            .ok_or(HarnessError::Driver(DriverError::SessionClosed))
    }

    /// Run one test body in a fresh evidence context.
    ///
    /// The report is published when the body completes. If the body panics
    /// or is cancelled, the evidence recorded so far is published with
    /// [`TestStatus::Broken`]; a panic carries its message into the report
    /// and is then resumed.
    pub async fn run<'a, T, F, Fut>(&'a self, test_name: &str, body: F) -> Result<T, HarnessError>
    where
        F: FnOnce(&'a Session) -> Fut,
        Fut: Future<Output = Result<T, HarnessError>> + 'a,
    {
        let trail = Evidence::new(test_name);
        let guard = ReportGuard::new(trail.clone(), self.sink.clone());

        let session = match self.session() {
            Ok(session) => session,
            Err(err) => {
                guard.finish(failed(&err));
                return Err(err);
            }
        };
        trail.bind_session(session.id());

        let outcome = AssertUnwindSafe(evidence::scope(trail, body(session)))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(class = %self.name, test = test_name, %message, "test panicked");
                guard.finish(TestStatus::Broken { message });
                panic::resume_unwind(payload);
            }
        };
        let status = match &result {
            Ok(_) => TestStatus::Passed,
            Err(err) => failed(err),
        };
        info!(class = %self.name, test = test_name, passed = result.is_ok(), "test finished");
        guard.finish(status);
        result
    }

    /// Close the class session. Never fails.
    pub async fn teardown(mut self) {
        let trail = Evidence::new(format!("{}::teardown", self.name));
        let guard = ReportGuard::new(trail.clone(), self.sink.clone());
        if let Some(session) = self.manager.session() {
            trail.bind_session(session.id());
        }
        evidence::scope(trail, self.manager.close()).await;
        guard.finish(TestStatus::Passed);
    }
}

impl std::fmt::Debug for TestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClass")
            .field("name", &self.name)
            .field("manager", &self.manager)
            .field("config", &self.config)
            .finish()
    }
}
