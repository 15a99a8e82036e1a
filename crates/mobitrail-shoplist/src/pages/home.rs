use mobitrail_core::action::Actions;
use mobitrail_core::error::HarnessError;
use mobitrail_core::evidence;
use mobitrail_core::session::Session;
use mobitrail_core::wait::Wait;
use tracing::debug;

use crate::locators;

/// The app's landing screen and its navigation tabs.
#[derive(Debug, Clone, Copy)]
pub struct HomePage<'s> {
    actions: Actions<'s>,
}

impl<'s> HomePage<'s> {
    pub fn new(session: &'s Session, wait: Wait) -> Self {
        Self {
            actions: Actions::new(session, wait),
        }
    }

    /// Navigate to the shopping-lists overview from any screen.
    pub async fn open_shopping_lists(&self) -> Result<(), HarnessError> {
        debug!("opening shopping lists");
        self.actions.tap(&locators::shopping_lists_tab()).await?;
        self.actions
            .confirm_visible(&locators::add_list_button())
            .await?;
        evidence::add_step("Shopping Lists opened");
        evidence::take_screenshot(self.actions.session(), "Shopping Lists").await;
        Ok(())
    }
}
