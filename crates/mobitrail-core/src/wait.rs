//! Bounded polling until a condition over UI state holds.
//!
//! [`Wait`] is the single polling loop in the crate. Every "wait for X"
//! helper, including [`Wait::for_visible`] and [`Wait::for_absent`], is a
//! predicate handed to [`Wait::poll`]; none of them carries its own loop.
//!
//! # Semantics
//!
//! - The predicate is evaluated immediately, then once per poll interval.
//! - The first `Some(value)` is returned without any further delay.
//! - Transient lookup failures ([`DriverError::is_transient`]) count as
//!   "not yet" and are retried. If the very last evaluation before the
//!   deadline failed that way, the error text is carried on the
//!   [`ConditionTimeout`].
//! - Any other driver error aborts the wait at once.
//! - The final evaluation happens at the deadline; sleeps are clipped to the
//!   remaining time so a wait never overruns by more than one predicate call.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use mobitrail_core::wait::Wait;
//! use mobitrail_core::element::Locator;
//! use mobitrail_core::session::Session;
//!
//! # async fn example(session: &Session) -> Result<(), mobitrail_core::wait::WaitError> {
//! let wait = Wait::new(Duration::from_secs(10), Duration::from_millis(250));
//! let banner = wait
//!     .for_visible(session, &Locator::accessibility_id("List has been archived successfully."))
//!     .await?;
//! wait.for_absent(session, &Locator::accessibility_id("Undo")).await?;
//! # let _ = banner;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info_span, trace, Instrument};

use crate::driver::DriverError;
use crate::element::{ElementRef, Locator};
use crate::session::Session;

/// Default upper bound for a wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay between predicate evaluations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// The condition never held within the deadline.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error(
    "timed out after {}ms (limit {}ms, {attempts} attempts) waiting for {description}",
    .elapsed.as_millis(),
    .timeout.as_millis()
)]
pub struct ConditionTimeout {
    /// What the caller was waiting for.
    pub description: String,
    pub timeout: Duration,
    pub elapsed: Duration,
    /// Number of predicate evaluations performed.
    pub attempts: u32,
    /// Transient lookup error seen on the final evaluation, if any.
    pub last_error: Option<String>,
}

/// Result of a wait that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Satisfied(T),
    TimedOut(ConditionTimeout),
}

impl<T> Outcome<T> {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Outcome::Satisfied(_))
    }

    pub fn into_result(self) -> Result<T, ConditionTimeout> {
        match self {
            Outcome::Satisfied(value) => Ok(value),
            Outcome::TimedOut(timeout) => Err(timeout),
        }
    }
}

#[derive(Error, Debug)]
pub enum WaitError {
    #[error(transparent)]
    Timeout(#[from] ConditionTimeout),

    /// A non-transient driver failure aborted the wait.
    #[error("wait aborted: {0}")]
    Driver(#[from] DriverError),
}

/// Timeout and poll interval for one wait invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

impl Wait {
    /// A zero poll interval is raised to one millisecond.
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Same poll interval, different timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Evaluate `predicate` until it yields a value or the timeout elapses.
    ///
    /// Returns `Err` only for non-transient driver errors.
    pub async fn poll<T, F, Fut>(
        &self,
        description: &str,
        mut predicate: F,
    ) -> Result<Outcome<T>, DriverError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, DriverError>>,
    {
        let span = info_span!("wait", condition = description);
        async {
            let start = Instant::now();
            let deadline = start + self.timeout;
            let mut attempts: u32 = 0;
            let mut last_error: Option<String>;

            loop {
                attempts += 1;
                match predicate().await {
                    Ok(Some(value)) => {
                        debug!(
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            attempts,
                            "condition satisfied"
                        );
                        return Ok(Outcome::Satisfied(value));
                    }
                    Ok(None) => last_error = None,
                    Err(e) if e.is_transient() => {
                        trace!(error = %e, attempts, "transient lookup failure");
                        last_error = Some(e.to_string());
                    }
                    Err(e) => {
                        debug!(error = %e, attempts, "wait aborted");
                        return Err(e);
                    }
                }

                let now = Instant::now();
                if now >= deadline {
                    let elapsed = now - start;
                    debug!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        attempts,
                        "condition timed out"
                    );
                    return Ok(Outcome::TimedOut(ConditionTimeout {
                        description: description.to_string(),
                        timeout: self.timeout,
                        elapsed,
                        attempts,
                        last_error,
                    }));
                }
                tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
            }
        }
        .instrument(span)
        .await
    }

    /// Like [`poll`](Self::poll), folding a timeout into the error.
    pub async fn until<T, F, Fut>(&self, description: &str, predicate: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, DriverError>>,
    {
        Ok(self.poll(description, predicate).await?.into_result()?)
    }

    /// Wait for an element matching `locator` to be present and displayed.
    pub async fn for_visible(
        &self,
        session: &Session,
        locator: &Locator,
    ) -> Result<ElementRef, WaitError> {
        let description = format!("{} to become visible", locator);
        self.until(&description, move || async move { visible_element(session, locator).await })
            .await
    }

    /// Wait until no displayed element matches `locator`.
    pub async fn for_absent(&self, session: &Session, locator: &Locator) -> Result<(), WaitError> {
        let description = format!("{} to become absent", locator);
        self.until(&description, move || async move { absent(session, locator).await })
            .await
    }
}

/// Free-function form of [`Wait::until`].
pub async fn wait_until<T, F, Fut>(
    description: &str,
    timeout: Duration,
    poll_interval: Duration,
    predicate: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, DriverError>>,
{
    Wait::new(timeout, poll_interval).until(description, predicate).await
}

async fn visible_element(
    session: &Session,
    locator: &Locator,
) -> Result<Option<ElementRef>, DriverError> {
    let driver = session.driver()?;
    let element = driver.find_element(locator).await?;
    if driver.is_displayed(&element).await? {
        Ok(Some(element))
    } else {
        Ok(None)
    }
}

async fn absent(session: &Session, locator: &Locator) -> Result<Option<()>, DriverError> {
    let driver = session.driver()?;
    let elements = match driver.find_elements(locator).await {
        Ok(elements) => elements,
        Err(DriverError::NoSuchElement(_)) => return Ok(Some(())),
        Err(e) => return Err(e),
    };
    for element in &elements {
        match driver.is_displayed(element).await {
            Ok(true) => return Ok(None),
            Ok(false) => {}
            // Detached since the lookup: gone.
            Err(e) if e.is_transient() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Some(()))
}
