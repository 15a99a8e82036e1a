//! Simulated shopping-list app for scenario tests.
//!
//! [`ShopApp`] keeps the app state (screens, lists, items, dialogs, banners)
//! and renders it into a flat node list on every query, the way UiAutomator2
//! exposes a Compose hierarchy. [`ShopConnector`] hands out drivers bound to
//! one shared app. Screen transitions and banners are timed against the tokio
//! clock so waits have something to wait for.

#![allow(dead_code)]


use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use mobitrail_core::capabilities::Capabilities;
use mobitrail_core::config::HarnessConfig;
use mobitrail_core::driver::{
    CapabilityMap, ConnectError, DriverError, RemoteDriver, SessionConnector,
};
use mobitrail_core::element::{ElementRef, Locator};
use mobitrail_shoplist::locators::{ITEM_REMOVED_MESSAGE, LIST_ARCHIVED_MESSAGE};

const VIEW: &str = "android.view.View";
const BUTTON: &str = "android.widget.Button";
const TEXT: &str = "android.widget.TextView";
const EDIT_TEXT: &str = "android.widget.EditText";
const CHECKBOX: &str = "android.widget.CheckBox";

/// Placeholder the app renders after an item name.
const ITEM_DETAIL: &str = "No name";

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Home,
    Lists,
    Detail(u32),
}

#[derive(Debug, Clone)]
struct Item {
    id: u32,
    name: String,
    checked: bool,
}

#[derive(Debug, Clone)]
struct ShoppingList {
    id: u32,
    name: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone, Copy)]
enum Dialog {
    NewList,
    NewItem,
    RenameList,
    EditItem(u32),
}

#[derive(Debug, Clone)]
enum Undo {
    Unarchive { index: usize, list: ShoppingList },
    RestoreItem { list_id: u32, index: usize, item: Item },
}

#[derive(Debug, Clone)]
struct Banner {
    message: &'static str,
    shown_at: Instant,
    hidden_at: Instant,
    undo: Undo,
}

#[derive(Debug)]
struct AppState {
    screen: Screen,
    screen_ready_at: Instant,
    lists: Vec<ShoppingList>,
    next_id: u32,
    menu_open: bool,
    dialog: Option<Dialog>,
    input: String,
    banner: Option<Banner>,
    removable_items: Option<usize>,
}

/// One rendered node.
#[derive(Debug, Clone)]
pub struct Node {
    pub key: String,
    pub class: &'static str,
    pub resource_id: &'static str,
    pub content_desc: String,
    pub text: String,
    pub checked: Option<bool>,
}

impl Node {
    fn new(key: impl Into<String>, class: &'static str, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            key: key.into(),
            class,
            resource_id: "",
            content_desc: label.clone(),
            text: label,
            checked: None,
        }
    }

    fn with_id(mut self, resource_id: &'static str) -> Self {
        self.resource_id = resource_id;
        self
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "content-desc" => Some(self.content_desc.clone()),
            "text" => Some(self.text.clone()),
            "resource-id" => Some(self.resource_id.to_string()),
            "class" => Some(self.class.to_string()),
            "checked" => self.checked.map(|c| c.to_string()),
            _ => None,
        }
    }
}

/// Timing knobs of the simulated app.
#[derive(Debug, Clone, Copy)]
pub struct AppTiming {
    /// Delay before a newly opened screen renders its content.
    pub transition: Duration,
    /// Delay before a banner appears.
    pub banner_delay: Duration,
    /// How long a banner and its undo control stay visible.
    pub banner_duration: Duration,
}

impl Default for AppTiming {
    fn default() -> Self {
        Self {
            transition: Duration::from_millis(200),
            banner_delay: Duration::from_millis(300),
            banner_duration: Duration::from_secs(4),
        }
    }
}

pub struct ShopApp {
    timing: AppTiming,
    state: Mutex<AppState>,
}

fn item_label(item: &Item) -> String {
    format!("{}, {}", item.name, ITEM_DETAIL)
}

fn render_item(nodes: &mut Vec<Node>, item: &Item, removable: bool) {
    let row = Node::new(format!("item-{}", item.id), VIEW, item_label(item));
    nodes.push(row.with_id("item_row"));
    let mut checkbox =
        Node::new(format!("item-{}-check", item.id), CHECKBOX, "").with_id("item_checkbox");
    checkbox.checked = Some(item.checked);
    nodes.push(checkbox);
    if removable {
        let remove = Node::new(format!("item-{}-remove", item.id), BUTTON, "Remove item");
        nodes.push(remove.with_id("item_remove"));
    }
}

impl ShopApp {
    /// Must be called inside a tokio runtime.
    pub fn new(timing: AppTiming) -> Arc<Self> {
        Arc::new(Self {
            timing,
            state: Mutex::new(AppState {
                screen: Screen::Home,
                screen_ready_at: Instant::now(),
                lists: Vec::new(),
                next_id: 1,
                menu_open: false,
                dialog: None,
                input: String::new(),
                banner: None,
                removable_items: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap()
    }

    /// Only the first `count` items of a list offer a remove control.
    pub fn limit_removable_items(&self, count: usize) {
        self.state().removable_items = Some(count);
    }

    /// Names of the lists in the overview, top first.
    pub fn list_names(&self) -> Vec<String> {
        self.state().lists.iter().map(|l| l.name.clone()).collect()
    }

    /// Names of the items of `list`, in order.
    pub fn item_names(&self, list: &str) -> Vec<String> {
        self.state()
            .lists
            .iter()
            .find(|l| l.name == list)
            .map(|l| l.items.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn checked_items(&self, list: &str) -> usize {
        self.state()
            .lists
            .iter()
            .find(|l| l.name == list)
            .map_or(0, |l| l.items.iter().filter(|i| i.checked).count())
    }

    fn render(&self) -> Vec<Node> {
        let state = self.state();
        let now = Instant::now();
        let mut nodes = vec![Node::new("nav-lists", BUTTON, "Shopping Lists")];

        if now >= state.screen_ready_at {
            match state.screen {
                Screen::Home => nodes.push(Node::new("home-title", TEXT, "Welcome")),
                Screen::Lists => {
                    nodes.push(Node::new("lists-title", TEXT, "Your lists"));
                    nodes.push(Node::new("add-list", BUTTON, "Add new list"));
                    for list in &state.lists {
                        let row = Node::new(format!("list-{}", list.id), VIEW, &list.name);
                        nodes.push(row.with_id("list_row"));
                    }
                }
                Screen::Detail(id) => {
                    if let Some(list) = state.lists.iter().find(|l| l.id == id) {
                        nodes.push(Node::new("detail-title", VIEW, &list.name));
                        nodes.push(Node::new("detail-more", BUTTON, "More options"));
                        nodes.push(Node::new("add-item", BUTTON, "Add item"));
                        for (position, item) in list.items.iter().enumerate() {
                            let removable =
                                state.removable_items.map_or(true, |limit| position < limit);
                            render_item(&mut nodes, item, removable);
                        }
                    }
                }
            }
        }

        if state.menu_open {
            nodes.push(Node::new("menu-rename", BUTTON, "Rename"));
            nodes.push(Node::new("menu-archive", BUTTON, "Archive"));
        }
        if state.dialog.is_some() {
            let mut input = Node::new("dialog-input", EDIT_TEXT, "");
            input.text = state.input.clone();
            nodes.push(input);
            nodes.push(Node::new("dialog-save", BUTTON, "Save"));
        }
        if let Some(banner) = &state.banner {
            if now >= banner.shown_at && now < banner.hidden_at {
                nodes.push(Node::new("banner", VIEW, banner.message));
                nodes.push(Node::new("banner-undo", BUTTON, "Undo"));
            }
        }
        nodes
    }

    fn select(&self, locator: &Locator) -> Result<Vec<Node>, DriverError> {
        let nodes = self.render();
        let selected: Vec<Node> = match locator {
            Locator::AccessibilityId(v) => {
                nodes.into_iter().filter(|n| n.content_desc == *v).collect()
            }
            Locator::Id(v) => nodes.into_iter().filter(|n| n.resource_id == v.as_str()).collect(),
            Locator::ClassName(v) => nodes.into_iter().filter(|n| n.class == v.as_str()).collect(),
            Locator::XPath(expr) => {
                let query = xpath::parse(expr).map_err(DriverError::CommandFailed)?;
                let matched: Vec<Node> = nodes
                    .into_iter()
                    .filter(|n| query.matches(n.class, |name| n.attribute(name)))
                    .collect();
                match query.index {
                    Some(i) => matched
                        .into_iter()
                        .skip(i.saturating_sub(1))
                        .take(usize::from(i > 0))
                        .collect(),
                    None => matched,
                }
            }
        };
        Ok(selected)
    }

    fn node(&self, element: &ElementRef) -> Result<Node, DriverError> {
        self.render()
            .into_iter()
            .find(|n| n.key == element.as_str())
            .ok_or_else(|| DriverError::StaleElement(element.to_string()))
    }

    fn navigate(&self, state: &mut AppState, screen: Screen) {
        state.screen = screen;
        state.screen_ready_at = Instant::now() + self.timing.transition;
        state.menu_open = false;
        state.dialog = None;
    }

    fn show_banner(&self, state: &mut AppState, message: &'static str, undo: Undo) {
        let shown_at = Instant::now() + self.timing.banner_delay;
        state.banner = Some(Banner {
            message,
            shown_at,
            hidden_at: shown_at + self.timing.banner_duration,
            undo,
        });
    }

    fn open_dialog(state: &mut AppState, dialog: Dialog, prefill: String) {
        state.dialog = Some(dialog);
        state.input = prefill;
    }

    fn current_list(state: &mut AppState) -> Result<&mut ShoppingList, DriverError> {
        let Screen::Detail(id) = state.screen else {
            return Err(DriverError::CommandFailed("no list is open".into()));
        };
        state
            .lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| DriverError::CommandFailed("open list no longer exists".into()))
    }

    fn save_dialog(&self, state: &mut AppState) -> Result<(), DriverError> {
        let dialog = state
            .dialog
            .take()
            .ok_or_else(|| DriverError::CommandFailed("no dialog".into()))?;
        let input = std::mem::take(&mut state.input);
        match dialog {
            Dialog::NewList => {
                let id = state.next_id;
                state.next_id += 1;
                state.lists.insert(
                    0,
                    ShoppingList {
                        id,
                        name: input,
                        items: Vec::new(),
                    },
                );
                self.navigate(state, Screen::Detail(id));
            }
            Dialog::NewItem => {
                let id = state.next_id;
                state.next_id += 1;
                Self::current_list(state)?.items.push(Item {
                    id,
                    name: input,
                    checked: false,
                });
            }
            Dialog::RenameList => Self::current_list(state)?.name = input,
            Dialog::EditItem(item_id) => {
                let list = Self::current_list(state)?;
                if let Some(item) = list.items.iter_mut().find(|i| i.id == item_id) {
                    item.name = input;
                }
            }
        }
        Ok(())
    }

    fn tap(&self, key: &str) -> Result<(), DriverError> {
        let mut guard = self.state();
        let state = &mut *guard;
        match key {
            "nav-lists" => self.navigate(state, Screen::Lists),
            "add-list" => Self::open_dialog(state, Dialog::NewList, String::new()),
            "add-item" => Self::open_dialog(state, Dialog::NewItem, String::new()),
            "detail-more" => state.menu_open = true,
            "menu-rename" => {
                state.menu_open = false;
                let name = Self::current_list(state)?.name.clone();
                Self::open_dialog(state, Dialog::RenameList, name);
            }
            "menu-archive" => {
                state.menu_open = false;
                let Screen::Detail(id) = state.screen else {
                    return Err(DriverError::CommandFailed("no list is open".into()));
                };
                if let Some(index) = state.lists.iter().position(|l| l.id == id) {
                    let list = state.lists.remove(index);
                    self.show_banner(state, LIST_ARCHIVED_MESSAGE, Undo::Unarchive { index, list });
                }
                self.navigate(state, Screen::Lists);
            }
            "dialog-save" => self.save_dialog(state)?,
            "banner-undo" => {
                if let Some(banner) = state.banner.take() {
                    match banner.undo {
                        Undo::Unarchive { index, list } => {
                            let index = index.min(state.lists.len());
                            state.lists.insert(index, list);
                        }
                        Undo::RestoreItem { list_id, index, item } => {
                            if let Some(list) = state.lists.iter_mut().find(|l| l.id == list_id) {
                                let index = index.min(list.items.len());
                                list.items.insert(index, item);
                            }
                        }
                    }
                }
            }
            other => self.tap_row(state, other)?,
        }
        Ok(())
    }

    fn tap_row(&self, state: &mut AppState, key: &str) -> Result<(), DriverError> {
        if let Some(id) = key.strip_prefix("list-").and_then(|s| s.parse::<u32>().ok()) {
            self.navigate(state, Screen::Detail(id));
            return Ok(());
        }
        let Some(rest) = key.strip_prefix("item-") else {
            return Err(DriverError::CommandFailed(format!("{key} is not clickable")));
        };
        let (id, suffix) = match rest.split_once('-') {
            Some((id, suffix)) => (id, Some(suffix)),
            None => (rest, None),
        };
        let id: u32 = id
            .parse()
            .map_err(|_| DriverError::CommandFailed(format!("bad element {key}")))?;
        let list = Self::current_list(state)?;
        let list_id = list.id;
        let index = list
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| DriverError::StaleElement(key.to_string()))?;
        match suffix {
            None => {
                let name = list.items[index].name.clone();
                Self::open_dialog(state, Dialog::EditItem(id), name);
            }
            Some("check") => list.items[index].checked = !list.items[index].checked,
            Some("remove") => {
                let item = list.items.remove(index);
                let undo = Undo::RestoreItem { list_id, index, item };
                self.show_banner(state, ITEM_REMOVED_MESSAGE, undo);
            }
            Some(other) => {
                return Err(DriverError::CommandFailed(format!("unknown control {other}")));
            }
        }
        Ok(())
    }

    fn type_into(&self, key: &str, text: &str, clear: bool) -> Result<(), DriverError> {
        if key != "dialog-input" {
            return Err(DriverError::CommandFailed(format!("{key} is not editable")));
        }
        let mut state = self.state();
        if clear {
            state.input.clear();
        }
        state.input.push_str(text);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Driver and connector
// ---------------------------------------------------------------------------

pub struct ShopDriver {
    remote_id: String,
    app: Arc<ShopApp>,
    quits: Arc<AtomicUsize>,
}

/// Minimal PNG signature; enough for evidence payloads.
const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[async_trait]
impl RemoteDriver for ShopDriver {
    fn session_id(&self) -> &str {
        &self.remote_id
    }

    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError> {
        self.app
            .select(locator)?
            .into_iter()
            .next()
            .map(|n| ElementRef::new(n.key))
            .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        Ok(self
            .app
            .select(locator)?
            .into_iter()
            .map(|n| ElementRef::new(n.key))
            .collect())
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError> {
        self.app.node(element).map(|_| true)
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        Ok(self.app.node(element)?.attribute(name))
    }

    async fn click(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.app.node(element)?;
        self.app.tap(element.as_str())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.app.node(element)?;
        self.app.type_into(element.as_str(), text, false)
    }

    async fn clear(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.app.node(element)?;
        self.app.type_into(element.as_str(), "", true)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(PNG.to_vec())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct ShopConnector {
    app: Arc<ShopApp>,
    connects: AtomicUsize,
    quits: Arc<AtomicUsize>,
}

impl ShopConnector {
    pub fn new(app: Arc<ShopApp>) -> Self {
        Self {
            app,
            connects: AtomicUsize::new(0),
            quits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for ShopConnector {
    async fn connect(
        &self,
        _server_url: &Url,
        capabilities: &CapabilityMap,
    ) -> Result<Box<dyn RemoteDriver>, ConnectError> {
        if capabilities.get("platformName").and_then(|v| v.as_str()) != Some("Android") {
            return Err(ConnectError::Rejected("only Android is supported".into()));
        }
        let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(ShopDriver {
            remote_id: format!("shop-{n}"),
            app: self.app.clone(),
            quits: self.quits.clone(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn capabilities(server_url: &str) -> Capabilities {
    Capabilities {
        platform_name: "Android".into(),
        automation_name: "UiAutomator2".into(),
        platform_version: "14".into(),
        device_name: "Pixel 8".into(),
        app_path: PathBuf::from("/apps/shopping-list.apk"),
        server_url: server_url.into(),
    }
}

pub fn test_config() -> HarnessConfig {
    HarnessConfig {
        wait_timeout_ms: 10_000,
        poll_interval_ms: 500,
        report_dir: None,
        workdir: Some(PathBuf::from("/work/shoplist")),
    }
}
