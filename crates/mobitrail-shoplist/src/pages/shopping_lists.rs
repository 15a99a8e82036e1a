//! Shopping-lists overview and list detail screens.

use std::time::Duration;

use mobitrail_core::action::{ActionError, Actions};
use mobitrail_core::driver::DriverError;
use mobitrail_core::element::Locator;
use mobitrail_core::error::HarnessError;
use mobitrail_core::evidence;
use mobitrail_core::session::Session;
use mobitrail_core::wait::Wait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::locators;

/// Lists overview plus the detail screen of the open list.
///
/// Random choices (which item to edit or remove) come from an owned
/// [`StdRng`]; use [`with_seed`](Self::with_seed) for a reproducible run.
#[derive(Debug)]
pub struct ShoppingListsPage<'s> {
    actions: Actions<'s>,
    rng: StdRng,
}

// The element vanished between the waited lookup and the listing.
fn vanished(action: &str, locator: &Locator) -> HarnessError {
    ActionError::ElementNotFound {
        action: action.to_string(),
        locator: locator.to_string(),
        waited: Duration::ZERO,
    }
    .into()
}

async fn count_matching(session: &Session, locator: &Locator) -> Result<usize, DriverError> {
    match session.driver()?.find_elements(locator).await {
        Ok(elements) => Ok(elements.len()),
        Err(DriverError::NoSuchElement(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

async fn count_unchecked(session: &Session, locator: &Locator) -> Result<usize, DriverError> {
    let driver = session.driver()?;
    let mut unchecked = 0;
    for checkbox in driver.find_elements(locator).await? {
        if driver.attribute(&checkbox, "checked").await?.as_deref() != Some("true") {
            unchecked += 1;
        }
    }
    Ok(unchecked)
}

impl<'s> ShoppingListsPage<'s> {
    pub fn new(session: &'s Session, wait: Wait) -> Self {
        Self {
            actions: Actions::new(session, wait),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(session: &'s Session, wait: Wait, seed: u64) -> Self {
        Self {
            actions: Actions::new(session, wait),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Wait until exactly `expected` elements match `locator`.
    async fn wait_for_count(
        &self,
        locator: &Locator,
        expected: usize,
    ) -> Result<usize, HarnessError> {
        let session = self.actions.session();
        let description = format!("{} to match {} elements", locator, expected);
        let count = self
            .actions
            .wait()
            .until(&description, move || async move {
                count_matching(session, locator)
                    .await
                    .map(|n| (n == expected).then_some(n))
            })
            .await?;
        Ok(count)
    }

    /// Create a list from the overview. The app opens the new list.
    pub async fn add_new_list(&self, name: &str) -> Result<(), HarnessError> {
        debug!(name, "adding list");
        self.actions.tap(&locators::add_list_button()).await?;
        self.actions.type_text(&locators::text_field(), name).await?;
        self.actions.tap(&locators::save_button()).await?;
        self.actions
            .confirm_visible(&Locator::accessibility_id(name))
            .await?;
        evidence::add_step(format!("List '{}' created", name));
        Ok(())
    }

    /// Add the default items to the open list. Returns the new item count.
    pub async fn add_items_to_list(&self) -> Result<usize, HarnessError> {
        let rows = locators::item_rows();
        let mut count = self.actions.count(&rows).await?;
        for name in locators::DEFAULT_ITEMS {
            self.actions.tap(&locators::add_item_button()).await?;
            self.actions.type_text(&locators::text_field(), name).await?;
            self.actions.tap(&locators::save_button()).await?;
            count = self.wait_for_count(&rows, count + 1).await?;
        }
        evidence::add_step(format!("{} items in list", count));
        Ok(count)
    }

    /// Tick every unchecked item of the open list.
    pub async fn check_all_items(&self) -> Result<usize, HarnessError> {
        let checkboxes = self.actions.find_all(&locators::item_checkboxes()).await?;
        let mut ticked = 0;
        for checkbox in &checkboxes {
            let checked = self.actions.element_attribute(checkbox, "checked").await?;
            if checked.as_deref() != Some("true") {
                self.actions.tap_element(checkbox).await?;
                ticked += 1;
            }
        }

        let session = self.actions.session();
        let locator = locators::item_checkboxes();
        let locator = &locator;
        self.actions
            .wait()
            .until("all items to be checked", move || async move {
                count_unchecked(session, locator)
                    .await
                    .map(|n| (n == 0).then_some(()))
            })
            .await?;
        debug!(ticked, total = checkboxes.len(), "items checked");
        evidence::add_step(format!("{} items checked", checkboxes.len()));
        evidence::take_screenshot(self.actions.session(), "All items checked").await;
        Ok(ticked)
    }

    /// Archive the open list through its options menu.
    ///
    /// Only requests the archive; the confirmation banner is left for the
    /// caller to verify.
    pub async fn archive_list(&self) -> Result<(), HarnessError> {
        self.actions.tap(&locators::more_options()).await?;
        self.actions.tap(&locators::archive_menu_item()).await?;
        evidence::add_step("Archive requested");
        evidence::take_screenshot(self.actions.session(), "Archive requested").await;
        Ok(())
    }

    /// Wait for the undo control of the last banner to go away.
    pub async fn wait_for_undo_to_disappear(&self) -> Result<(), HarnessError> {
        self.actions.confirm_absent(&locators::undo_button()).await?;
        evidence::add_step("Undo control gone");
        evidence::take_screenshot(self.actions.session(), "Undo control gone").await;
        Ok(())
    }

    /// Rename the first list in the overview. Leaves that list open.
    pub async fn rename_list(&self, new_name: &str) -> Result<(), HarnessError> {
        self.actions.tap(&locators::list_rows()).await?;
        self.actions.tap(&locators::more_options()).await?;
        self.actions.tap(&locators::rename_menu_item()).await?;
        self.actions
            .clear_and_type(&locators::text_field(), new_name)
            .await?;
        self.actions.tap(&locators::save_button()).await?;
        self.actions
            .confirm_visible(&Locator::accessibility_id(new_name))
            .await?;
        evidence::add_step(format!("List renamed to '{}'", new_name));
        evidence::take_screenshot(self.actions.session(), "List renamed").await;
        Ok(())
    }

    /// Rename one randomly chosen item. Returns the item's previous label.
    pub async fn edit_random_item(&mut self, new_name: &str) -> Result<String, HarnessError> {
        let rows = locators::item_rows();
        self.actions.find(&rows).await?;
        let items = self.actions.find_all(&rows).await?;
        if items.is_empty() {
            return Err(vanished("edit_random_item", &rows));
        }
        let index = self.rng.gen_range(0..items.len());
        let target = &items[index];

        let previous = self
            .actions
            .element_attribute(target, "content-desc")
            .await?
            .unwrap_or_default();
        debug!(index, previous = %previous, "editing item");
        self.actions.tap_element(target).await?;
        self.actions
            .clear_and_type(&locators::text_field(), new_name)
            .await?;
        self.actions.tap(&locators::save_button()).await?;
        evidence::add_step(format!("Item '{}' renamed to '{}'", previous, new_name));
        Ok(previous)
    }

    /// Remove one randomly chosen item. Returns its position in the list.
    pub async fn remove_random_item(&mut self) -> Result<usize, HarnessError> {
        let buttons = locators::item_remove_buttons();
        self.actions.find(&buttons).await?;
        let candidates = self.actions.find_all(&buttons).await?;
        if candidates.is_empty() {
            return Err(vanished("remove_random_item", &buttons));
        }
        let index = self.rng.gen_range(0..candidates.len());
        debug!(index, total = candidates.len(), "removing item");
        self.actions.tap_element(&candidates[index]).await?;
        evidence::add_step(format!("Item {} removed", index + 1));
        Ok(index)
    }

    /// Remove each item in turn and undo the removal right away.
    ///
    /// Returns the item count, which is unchanged once every undo lands.
    pub async fn remove_all_items_with_undo(&self) -> Result<usize, HarnessError> {
        let rows = locators::item_rows();
        let remove = locators::item_remove_buttons();
        let total = self.actions.count(&rows).await?;
        for index in 0..total {
            let buttons = self.actions.find_all(&remove).await?;
            let Some(button) = buttons.get(index) else {
                return Err(vanished("remove_all_items_with_undo", &remove));
            };
            self.actions.tap_element(button).await?;
            self.actions.tap(&locators::undo_button()).await?;
            self.wait_for_count(&rows, total).await?;
        }
        evidence::add_step(format!("Removed and restored {} items", total));
        Ok(total)
    }

    /// Lists shown in the overview.
    pub async fn list_count(&self) -> Result<usize, HarnessError> {
        self.actions.count(&locators::list_rows()).await
    }

    /// Items in the open list.
    pub async fn item_count(&self) -> Result<usize, HarnessError> {
        self.actions.count(&locators::item_rows()).await
    }
}
