//! Umbrella error for test bodies and page-object actions.

use thiserror::Error;

use crate::action::ActionError;
use crate::capabilities::CapabilityError;
use crate::driver::DriverError;
use crate::report::FailureCategory;
use crate::session::SessionCreationError;
use crate::wait::{ConditionTimeout, WaitError};

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Capabilities(#[from] CapabilityError),

    #[error(transparent)]
    Session(#[from] SessionCreationError),

    /// The UI never reached the awaited state.
    #[error(transparent)]
    Timeout(#[from] ConditionTimeout),

    /// A page-object action could not be carried out.
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<WaitError> for HarnessError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Timeout(t) => HarnessError::Timeout(t),
            WaitError::Driver(e) => HarnessError::Driver(e),
        }
    }
}

impl HarnessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HarnessError::Timeout(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self, HarnessError::Action(_))
    }

    /// Report category for this failure.
    pub fn category(&self) -> FailureCategory {
        match self {
            HarnessError::Timeout(_) => FailureCategory::ConditionTimeout,
            HarnessError::Action(_) => FailureCategory::Action,
            HarnessError::Session(_) | HarnessError::Capabilities(_) => FailureCategory::Session,
            HarnessError::Driver(_) => FailureCategory::Other,
        }
    }
}
