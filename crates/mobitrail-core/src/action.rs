//! Building blocks for page-object actions.
//!
//! [`Actions`] binds a [`Session`] to a [`Wait`] configuration and offers the
//! primitive interactions page objects are written in terms of. Two failure
//! modes are kept apart on purpose:
//!
//! - Locating an element to act on retries through the wait primitive; if it
//!   never shows up the action fails with [`ActionError::ElementNotFound`].
//! - Confirming that an action took effect ([`Actions::confirm_visible`],
//!   [`Actions::confirm_absent`]) fails with a
//!   [`ConditionTimeout`](crate::wait::ConditionTimeout).
//!
//! # Example
//!
//! ```no_run
//! use mobitrail_core::action::Actions;
//! use mobitrail_core::element::Locator;
//! use mobitrail_core::session::Session;
//! use mobitrail_core::wait::Wait;
//!
//! # async fn example(session: &Session) -> Result<(), mobitrail_core::error::HarnessError> {
//! let actions = Actions::new(session, Wait::default());
//! actions.tap(&Locator::accessibility_id("Add list")).await?;
//! actions.type_text(&Locator::class_name("android.widget.EditText"), "Groceries").await?;
//! actions.confirm_visible(&Locator::accessibility_id("Groceries")).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

use crate::driver::{DriverError, RemoteDriver};
use crate::element::{ElementRef, Locator};
use crate::error::HarnessError;
use crate::session::Session;
use crate::wait::{Wait, WaitError};

/// A page-object action could not complete.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("{action}: no visible element matching {locator} after {}ms", .waited.as_millis())]
    ElementNotFound {
        action: String,
        locator: String,
        waited: Duration,
    },

    #[error("{action} rejected: {source}")]
    Rejected {
        action: String,
        #[source]
        source: DriverError,
    },
}

impl ActionError {
    fn rejected(action: &str, source: DriverError) -> Self {
        ActionError::Rejected {
            action: action.to_string(),
            source,
        }
    }
}

/// Session-scoped interaction helpers for page objects.
#[derive(Debug, Clone, Copy)]
pub struct Actions<'s> {
    session: &'s Session,
    wait: Wait,
}

impl<'s> Actions<'s> {
    pub fn new(session: &'s Session, wait: Wait) -> Self {
        Self { session, wait }
    }

    pub fn session(&self) -> &'s Session {
        self.session
    }

    pub fn wait(&self) -> Wait {
        self.wait
    }

    /// A copy using a different wait configuration.
    pub fn with_wait(&self, wait: Wait) -> Self {
        Self { wait, ..*self }
    }

    async fn instrumented<T, Fut>(
        &self,
        action: &'static str,
        target: String,
        fut: Fut,
    ) -> Result<T, HarnessError>
    where
        Fut: Future<Output = Result<T, HarnessError>>,
    {
        let span = info_span!("action", action, target = %target);
        async move {
            let start = Instant::now();
            let result = fut.await;
            debug!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                success = result.is_ok(),
                "action complete"
            );
            result
        }
        .instrument(span)
        .await
    }

    fn driver(&self, action: &str) -> Result<&'s dyn RemoteDriver, ActionError> {
        self.session
            .driver()
            .map_err(|e| ActionError::rejected(action, e))
    }

    async fn locate(&self, action: &str, locator: &Locator) -> Result<ElementRef, ActionError> {
        match self.wait.for_visible(self.session, locator).await {
            Ok(element) => Ok(element),
            Err(WaitError::Timeout(t)) => Err(ActionError::ElementNotFound {
                action: action.to_string(),
                locator: locator.to_string(),
                waited: t.elapsed,
            }),
            Err(WaitError::Driver(e)) => Err(ActionError::rejected(action, e)),
        }
    }

    /// Locate a visible element, retrying until the wait timeout.
    pub async fn find(&self, locator: &Locator) -> Result<ElementRef, HarnessError> {
        self.instrumented("find", locator.to_string(), async {
            Ok(self.locate("find", locator).await?)
        })
        .await
    }

    /// Every element currently matching `locator`, without waiting.
    pub async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, HarnessError> {
        self.instrumented("find_all", locator.to_string(), self.list("find_all", locator))
            .await
    }

    async fn list(&self, action: &str, locator: &Locator) -> Result<Vec<ElementRef>, HarnessError> {
        let driver = self.driver(action)?;
        match driver.find_elements(locator).await {
            Ok(elements) => Ok(elements),
            Err(DriverError::NoSuchElement(_)) => Ok(Vec::new()),
            Err(e) => Err(ActionError::rejected(action, e).into()),
        }
    }

    /// Number of elements currently matching `locator`.
    pub async fn count(&self, locator: &Locator) -> Result<usize, HarnessError> {
        self.instrumented("count", locator.to_string(), async {
            Ok(self.list("count", locator).await?.len())
        })
        .await
    }

    pub async fn tap(&self, locator: &Locator) -> Result<(), HarnessError> {
        self.instrumented("tap", locator.to_string(), async {
            let element = self.locate("tap", locator).await?;
            self.click(&element).await
        })
        .await
    }

    /// Tap an element that was already located.
    pub async fn tap_element(&self, element: &ElementRef) -> Result<(), HarnessError> {
        self.instrumented("tap", element.to_string(), self.click(element))
            .await
    }

    async fn click(&self, element: &ElementRef) -> Result<(), HarnessError> {
        let driver = self.driver("tap")?;
        driver
            .click(element)
            .await
            .map_err(|e| ActionError::rejected("tap", e).into())
    }

    pub async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), HarnessError> {
        let fut = self.type_inner(locator, text, false);
        self.instrumented("type_text", locator.to_string(), fut)
            .await
    }

    /// Clear an editable element, then type into it.
    pub async fn clear_and_type(&self, locator: &Locator, text: &str) -> Result<(), HarnessError> {
        let fut = self.type_inner(locator, text, true);
        self.instrumented("clear_and_type", locator.to_string(), fut)
            .await
    }

    async fn type_inner(
        &self,
        locator: &Locator,
        text: &str,
        clear: bool,
    ) -> Result<(), HarnessError> {
        let action = if clear { "clear_and_type" } else { "type_text" };
        let element = self.locate(action, locator).await?;
        let driver = self.driver(action)?;
        if clear {
            driver
                .clear(&element)
                .await
                .map_err(|e| ActionError::rejected(action, e))?;
        }
        driver
            .send_keys(&element, text)
            .await
            .map_err(|e| ActionError::rejected(action, e))?;
        Ok(())
    }

    /// Read an attribute of the first visible element matching `locator`.
    pub async fn attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>, HarnessError> {
        self.instrumented("attribute", locator.to_string(), async {
            let element = self.locate("attribute", locator).await?;
            self.read_attribute(&element, name).await
        })
        .await
    }

    pub async fn element_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, HarnessError> {
        self.instrumented("attribute", element.to_string(), self.read_attribute(element, name))
            .await
    }

    async fn read_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, HarnessError> {
        let driver = self.driver("attribute")?;
        driver
            .attribute(element, name)
            .await
            .map_err(|e| ActionError::rejected("attribute", e).into())
    }

    pub async fn swipe(
        &self,
        start: (i32, i32),
        end: (i32, i32),
        duration_ms: u64,
    ) -> Result<(), HarnessError> {
        let target = format!("{:?} -> {:?}", start, end);
        self.instrumented("swipe", target, async {
            let driver = self.driver("swipe")?;
            driver
                .swipe(start, end, duration_ms)
                .await
                .map_err(|e| ActionError::rejected("swipe", e))?;
            Ok(())
        })
        .await
    }

    /// Confirm an effect became visible.
    pub async fn confirm_visible(&self, locator: &Locator) -> Result<ElementRef, HarnessError> {
        self.instrumented("confirm_visible", locator.to_string(), async {
            Ok(self.wait.for_visible(self.session, locator).await?)
        })
        .await
    }

    /// Confirm an element went away.
    pub async fn confirm_absent(&self, locator: &Locator) -> Result<(), HarnessError> {
        self.instrumented("confirm_absent", locator.to_string(), async {
            Ok(self.wait.for_absent(self.session, locator).await?)
        })
        .await
    }
}
