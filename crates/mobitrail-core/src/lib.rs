//! # mobitrail-core
//!
//! Core library for driving mobile-app UI tests against a remote automation
//! server (Appium-style).
//!
//! The crate owns the three pieces every test class needs and leaves page
//! objects and scenarios to its callers:
//!
//! - opening and closing a remote session from a capability set,
//! - waiting for UI conditions with a bounded, polling wait,
//! - recording an ordered evidence trail per test and publishing it as a report.
//!
//! ## Modules
//!
//! - [`capabilities`] - Capability set, environment loading and W3C capability map
//! - [`driver`] - The [`RemoteDriver`](driver::RemoteDriver) / [`SessionConnector`](driver::SessionConnector) seam to the wire client
//! - [`element`] - Locator strategies and element references
//! - [`session`] - Session lifecycle and the per-class [`SessionManager`](session::SessionManager)
//! - [`wait`] - Condition waits with timeout and poll interval
//! - [`evidence`] - Task-scoped evidence trails (steps, screenshots, attachments)
//! - [`action`] - Interaction helpers page objects are built from
//! - [`report`] - Test reports and report sinks
//! - [`harness`] - The [`TestClass`](harness::TestClass) fixture: setup, run, teardown
//! - [`config`] - Persistent settings in `~/.mobitrail/config.json`
//! - [`logging`] - Tracing subscriber setup
//! - [`error`] - The umbrella [`HarnessError`](error::HarnessError)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobitrail_core::action::Actions;
//! use mobitrail_core::capabilities::{Capabilities, EnvSource};
//! use mobitrail_core::config::HarnessConfig;
//! use mobitrail_core::driver::SessionConnector;
//! use mobitrail_core::element::Locator;
//! use mobitrail_core::evidence;
//! use mobitrail_core::harness::TestClass;
//! use mobitrail_core::report::JsonlReportSink;
//!
//! # async fn example(connector: Arc<dyn SessionConnector>) -> Result<(), mobitrail_core::error::HarnessError> {
//! let config = HarnessConfig::load();
//! let sink = Arc::new(JsonlReportSink::new(config.report_dir()));
//! let caps = Capabilities::from_source(&EnvSource::default())?;
//! let class = TestClass::setup("Scenarios", caps, connector, sink, config).await?;
//! let wait = class.wait();
//!
//! class
//!     .run("open_lists", |session| async move {
//!         let actions = Actions::new(session, wait);
//!         evidence::add_step("Opening Shopping Lists page");
//!         actions.tap(&Locator::accessibility_id("Shopping Lists")).await?;
//!         evidence::take_screenshot(session, "Lists").await;
//!         Ok(())
//!     })
//!     .await?;
//!
//! class.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod capabilities;
pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod evidence;
pub mod harness;
pub mod logging;
pub mod report;
pub mod session;
pub mod wait;
