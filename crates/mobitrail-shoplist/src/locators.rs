//! Locators and UI strings of the shopping-list app.

use mobitrail_core::element::Locator;

/// Banner shown after a list is archived.
pub const LIST_ARCHIVED_MESSAGE: &str = "List has been archived successfully.";

/// Banner shown after an item is removed.
pub const ITEM_REMOVED_MESSAGE: &str = "Item has been removed from the list.";

/// Items created by [`ShoppingListsPage::add_items_to_list`](crate::pages::ShoppingListsPage::add_items_to_list).
pub const DEFAULT_ITEMS: [&str; 3] = ["Item 1", "Item 2", "Item 3"];

pub fn shopping_lists_tab() -> Locator {
    Locator::accessibility_id("Shopping Lists")
}

pub fn add_list_button() -> Locator {
    Locator::accessibility_id("Add new list")
}

pub fn add_item_button() -> Locator {
    Locator::accessibility_id("Add item")
}

pub fn more_options() -> Locator {
    Locator::accessibility_id("More options")
}

pub fn rename_menu_item() -> Locator {
    Locator::accessibility_id("Rename")
}

pub fn archive_menu_item() -> Locator {
    Locator::accessibility_id("Archive")
}

pub fn save_button() -> Locator {
    Locator::accessibility_id("Save")
}

pub fn undo_button() -> Locator {
    Locator::accessibility_id("Undo")
}

pub fn text_field() -> Locator {
    Locator::class_name("android.widget.EditText")
}

pub fn list_rows() -> Locator {
    Locator::id("list_row")
}

pub fn item_rows() -> Locator {
    Locator::id("item_row")
}

pub fn item_checkboxes() -> Locator {
    Locator::id("item_checkbox")
}

pub fn item_remove_buttons() -> Locator {
    Locator::id("item_remove")
}

/// First list-like view on screen; the list title inside a list.
pub fn first_list_view() -> Locator {
    Locator::xpath("(//android.view.View[contains(@content-desc, 'List')])[1]")
}

/// An item row by its rendered text, e.g. `"Milk, No name"`.
pub fn item_with_text(text: &str) -> Locator {
    Locator::xpath(format!("//android.view.View[@text='{}']", text))
}
