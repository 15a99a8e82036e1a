//! Capability set used to request a remote automation session.
//!
//! [`Capabilities`] is built once, before a session is opened, from any
//! [`CapabilitySource`] (a read-only key/value provider) and never mutated
//! afterwards.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::driver::CapabilityMap;

pub const PLATFORM_NAME: &str = "platformName";
pub const AUTOMATION_NAME: &str = "automationName";
pub const PLATFORM_VERSION: &str = "platformVersion";
pub const DEVICE_NAME: &str = "deviceName";
pub const APP_PATH: &str = "appPath";
pub const SERVER_URL: &str = "serverUrl";

const REQUIRED_KEYS: [&str; 6] = [
    PLATFORM_NAME,
    AUTOMATION_NAME,
    PLATFORM_VERSION,
    DEVICE_NAME,
    APP_PATH,
    SERVER_URL,
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("missing capability '{0}'")]
    Missing(String),

    #[error("capability '{0}' is empty")]
    Empty(String),
}

/// Read-only key/value provider for capability settings.
pub trait CapabilitySource {
    fn get(&self, key: &str) -> Option<String>;
}

impl CapabilitySource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads capabilities from environment variables.
///
/// `platformName` is looked up as `{prefix}_PLATFORM_NAME`, `serverUrl` as
/// `{prefix}_SERVER_URL`, and so on.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Environment variable name for a capability key.
    pub fn var_name(&self, key: &str) -> String {
        let mut name = self.prefix.clone();
        name.push('_');
        for ch in key.chars() {
            if ch.is_ascii_uppercase() {
                name.push('_');
            }
            name.push(ch.to_ascii_uppercase());
        }
        name
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new("MOBITRAIL")
    }
}

impl CapabilitySource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// Immutable capability record for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub platform_name: String,
    pub automation_name: String,
    pub platform_version: String,
    pub device_name: String,
    /// Application path, relative to the working-directory root.
    pub app_path: PathBuf,
    pub server_url: String,
}

impl Capabilities {
    /// Load every required key from `source`.
    pub fn from_source(source: &dyn CapabilitySource) -> Result<Self, CapabilityError> {
        let mut values = HashMap::with_capacity(REQUIRED_KEYS.len());
        for key in REQUIRED_KEYS {
            let value = source
                .get(key)
                .ok_or_else(|| CapabilityError::Missing(key.to_string()))?;
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(CapabilityError::Empty(key.to_string()));
            }
            values.insert(key, value);
        }
        // Every key was inserted above.
        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        Ok(Self {
            platform_name: take(PLATFORM_NAME),
            automation_name: take(AUTOMATION_NAME),
            platform_version: take(PLATFORM_VERSION),
            device_name: take(DEVICE_NAME),
            app_path: PathBuf::from(take(APP_PATH)),
            server_url: take(SERVER_URL),
        })
    }

    /// Absolute application path, resolved against `workdir`.
    ///
    /// A leading separator on the configured path is treated as "relative to
    /// the root", so `/apps/list.apk` and `apps/list.apk` resolve the same way.
    pub fn resolve_app_path(&self, workdir: &Path) -> PathBuf {
        let relative: PathBuf = self
            .app_path
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        workdir.join(relative)
    }

    /// Build the W3C capability object, using `appium:` vendor prefixes for
    /// everything except `platformName`.
    pub fn to_capability_map(&self, workdir: &Path) -> CapabilityMap {
        let mut map = CapabilityMap::new();
        map.insert(PLATFORM_NAME.into(), Value::String(self.platform_name.clone()));
        map.insert(
            "appium:automationName".into(),
            Value::String(self.automation_name.clone()),
        );
        map.insert(
            "appium:platformVersion".into(),
            Value::String(self.platform_version.clone()),
        );
        map.insert(
            "appium:app".into(),
            Value::String(self.resolve_app_path(workdir).to_string_lossy().into_owned()),
        );
        map.insert("appium:deviceName".into(), Value::String(self.device_name.clone()));
        map
    }
}
