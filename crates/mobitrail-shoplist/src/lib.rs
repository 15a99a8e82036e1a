//! # mobitrail-shoplist
//!
//! Page objects for the shopping-list Android app.
//!
//! Pages are thin: each operation is a handful of [`Actions`](mobitrail_core::action::Actions)
//! calls plus an evidence step. They borrow the class session and never own
//! it, so a page is created per test body:
//!
//! ```no_run
//! use mobitrail_core::error::HarnessError;
//! use mobitrail_core::session::Session;
//! use mobitrail_core::wait::Wait;
//! use mobitrail_shoplist::pages::{HomePage, ShoppingListsPage};
//!
//! # async fn example(session: &Session) -> Result<(), HarnessError> {
//! let wait = Wait::default();
//! HomePage::new(session, wait).open_shopping_lists().await?;
//!
//! let lists = ShoppingListsPage::new(session, wait);
//! lists.add_new_list("My Shopping List").await?;
//! lists.add_items_to_list().await?;
//! lists.check_all_items().await?;
//! lists.archive_list().await?;
//! lists.wait_for_undo_to_disappear().await?;
//! # Ok(())
//! # }
//! ```

pub mod locators;
pub mod pages;
