//! Application configuration.
//!
//! A run is configured by a base `app_config.json` plus an optional
//! platform file `app_config_<platform>.json`. [`ConfigLoader`] merges the
//! two and produces an immutable [`AppConfig`].

mod loader;
mod platform;

pub use loader::{
    merge_sections, ConfigLoader, DEFAULT_CONFIG_FILE, DEVICE_ENV, PLATFORM_ENV,
};
pub use platform::{resolve_platform, Platform, PlatformHints, PlatformSource, ResolvedPlatform};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Appium server used when the config does not name one
pub const DEFAULT_SERVER_URL: &str = "http://localhost:4723";

/// Environment name used when the config does not name one
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// The `app` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Build number of the app under test
    #[serde(deserialize_with = "scalar_string")]
    pub build_number: String,
    /// Version of the app under test
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    /// Path or URL of the app package
    #[serde(deserialize_with = "scalar_string")]
    pub app_path: String,
    /// Android package name
    pub package_name: Option<String>,
    /// Android launch activity
    pub activity_name: Option<String>,
    /// iOS bundle identifier
    pub bundle_id: Option<String>,
    /// Keys not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `environment` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSection {
    /// Declared platform
    pub platform: Option<String>,
    /// OS version of the device
    #[serde(deserialize_with = "scalar_string")]
    pub platform_version: String,
    /// Device name or UDID alias
    #[serde(deserialize_with = "scalar_string")]
    pub device_name: String,
    /// Automation engine override
    pub automation_name: Option<String>,
    /// Appium server URL
    pub server_url: Option<String>,
    /// Environment name (selects test-data overrides)
    pub environment: Option<String>,
    /// Extra capabilities applied on Android only
    pub android_capabilities: Map<String, Value>,
    /// Extra capabilities applied on iOS only
    pub ios_capabilities: Map<String, Value>,
    /// Keys not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Merged, immutable configuration for one test run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    app: AppSection,
    environment: EnvironmentSection,
    capabilities: Map<String, Value>,
    platform: ResolvedPlatform,
    sources: Vec<PathBuf>,
}

impl AppConfig {
    /// Build from already merged sections.
    #[must_use]
    pub fn new(
        app: AppSection,
        environment: EnvironmentSection,
        capabilities: Map<String, Value>,
        platform: ResolvedPlatform,
    ) -> Self {
        Self {
            app,
            environment,
            capabilities,
            platform,
            sources: Vec::new(),
        }
    }

    pub(crate) fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    /// The `app` section
    #[must_use]
    pub fn app(&self) -> &AppSection {
        &self.app
    }

    /// The `environment` section
    #[must_use]
    pub fn environment(&self) -> &EnvironmentSection {
        &self.environment
    }

    /// The raw `capabilities` section
    #[must_use]
    pub fn capabilities_section(&self) -> &Map<String, Value> {
        &self.capabilities
    }

    /// Files the config was merged from, base first
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Selected platform
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform.platform
    }

    /// Source that selected the platform
    #[must_use]
    pub fn platform_source(&self) -> PlatformSource {
        self.platform.source
    }

    /// App build number
    #[must_use]
    pub fn build_number(&self) -> &str {
        &self.app.build_number
    }

    /// App version
    #[must_use]
    pub fn version(&self) -> &str {
        &self.app.version
    }

    /// Environment name, `"default"` when unset
    #[must_use]
    pub fn environment_name(&self) -> &str {
        self.environment
            .environment
            .as_deref()
            .unwrap_or(DEFAULT_ENVIRONMENT)
    }

    /// Device name
    #[must_use]
    pub fn device(&self) -> &str {
        &self.environment.device_name
    }

    /// Appium server URL
    #[must_use]
    pub fn server_url(&self) -> &str {
        self.environment
            .server_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVER_URL)
    }

    /// App identifier used to terminate/activate the app (package or bundle id)
    #[must_use]
    pub fn app_id(&self) -> Option<&str> {
        match self.platform() {
            Platform::Android => self.app.package_name.as_deref(),
            Platform::Ios => self.app.bundle_id.as_deref(),
        }
    }

    /// Session capabilities for the selected platform.
    ///
    /// Base keys first, then the `capabilities` section, then the
    /// platform-specific keys and extra capabilities. Later entries win.
    #[must_use]
    pub fn capabilities(&self) -> Map<String, Value> {
        let platform = self.platform();
        let env = &self.environment;
        let app = &self.app;

        let mut caps = Map::new();
        let _ = caps.insert("platformName".into(), platform.as_str().into());
        insert_non_empty(&mut caps, "platformVersion", &env.platform_version);
        insert_non_empty(&mut caps, "deviceName", &env.device_name);
        insert_non_empty(&mut caps, "app", &app.app_path);
        caps.extend(self.capabilities.clone());

        let automation = env
            .automation_name
            .as_deref()
            .unwrap_or_else(|| platform.default_automation_name());
        let _ = caps.insert("automationName".into(), automation.into());

        match platform {
            Platform::Android => {
                insert_opt(&mut caps, "appPackage", app.package_name.as_deref());
                insert_opt(&mut caps, "appActivity", app.activity_name.as_deref());
                caps.extend(env.android_capabilities.clone());
            }
            Platform::Ios => {
                insert_opt(&mut caps, "bundleId", app.bundle_id.as_deref());
                caps.extend(env.ios_capabilities.clone());
            }
        }
        caps
    }

    /// Most specific config source (the platform file when one was merged)
    #[must_use]
    pub fn primary_source(&self) -> Option<&Path> {
        self.sources.last().map(PathBuf::as_path)
    }
}

/// Accept a string or a number (`"build_number": 100`); `null` reads as empty.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

fn insert_non_empty(caps: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        let _ = caps.insert(key.to_string(), value.into());
    }
}

fn insert_opt(caps: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        let _ = caps.insert(key.to_string(), value.into());
    }
}
