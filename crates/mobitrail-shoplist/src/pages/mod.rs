//! Page objects.

mod home;
mod shopping_lists;

pub use home::HomePage;
pub use shopping_lists::ShoppingListsPage;
