//! Config file discovery and merging.

use super::platform::{resolve_platform, PlatformHints, PlatformSource, ResolvedPlatform};
use super::{AppConfig, AppSection, EnvironmentSection};
use crate::error::{PomError, PomResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base config file name inside the config directory
pub const DEFAULT_CONFIG_FILE: &str = "app_config.json";

/// Environment variable selecting the platform
pub const PLATFORM_ENV: &str = "APPIUM_PLATFORM";

/// Environment variable overriding `environment.device_name`
pub const DEVICE_ENV: &str = "APPIUM_DEVICE";

type Document = Map<String, Value>;

/// Loads and merges `app_config.json` with a platform file.
///
/// # Example
///
/// ```no_run
/// use appium_pom::config::ConfigLoader;
///
/// let config = ConfigLoader::from_env("config").with_platform("ios").load()?;
/// println!("{} on {}", config.platform(), config.server_url());
/// # Ok::<(), appium_pom::PomError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    platform: Option<String>,
    env_platform: Option<String>,
    device: Option<String>,
    env_device: Option<String>,
}

impl ConfigLoader {
    /// Loader for a config directory, ignoring the process environment.
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            config_file: None,
            platform: None,
            env_platform: None,
            device: None,
            env_device: None,
        }
    }

    /// Loader that also honours `APPIUM_PLATFORM` and `APPIUM_DEVICE`.
    #[must_use]
    pub fn from_env(config_dir: impl Into<PathBuf>) -> Self {
        Self::new(config_dir)
            .with_env_platform(std::env::var(PLATFORM_ENV).ok())
            .with_env_device(std::env::var(DEVICE_ENV).ok())
    }

    /// Select the platform explicitly (highest priority)
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Use a specific config file as the platform file
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Value standing in for `APPIUM_PLATFORM`
    #[must_use]
    pub fn with_env_platform(mut self, platform: Option<String>) -> Self {
        self.env_platform = platform;
        self
    }

    /// Select the device explicitly
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Value standing in for `APPIUM_DEVICE`
    #[must_use]
    pub fn with_env_device(mut self, device: Option<String>) -> Self {
        self.env_device = device;
        self
    }

    /// Config directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the platform file for a given platform token
    #[must_use]
    pub fn platform_file(&self, token: &str) -> PathBuf {
        self.config_dir.join(format!("app_config_{token}.json"))
    }

    fn explicit_file(&self) -> PomResult<Option<PathBuf>> {
        let Some(path) = &self.config_file else {
            return Ok(None);
        };
        let path = if path.is_relative() && !path.exists() {
            self.config_dir.join(path)
        } else {
            path.clone()
        };
        if !path.is_file() {
            return Err(PomError::config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        Ok(Some(path))
    }

    /// Resolve the platform, merge the config files and build an [`AppConfig`].
    pub fn load(&self) -> PomResult<AppConfig> {
        let base_path = self.config_dir.join(DEFAULT_CONFIG_FILE);
        let base = if base_path.is_file() {
            Some(read_document(&base_path)?)
        } else {
            None
        };

        let explicit = match self.explicit_file()? {
            Some(path) => {
                let doc = read_document(&path)?;
                Some((path, doc))
            }
            None => None,
        };

        let declared = explicit
            .as_ref()
            .and_then(|(_, doc)| declared_platform(doc))
            .or_else(|| base.as_ref().and_then(declared_platform));

        let resolved = resolve_platform(&PlatformHints {
            explicit: self.platform.as_deref(),
            env: self.env_platform.as_deref(),
            file_name: explicit.as_ref().map(|(path, _)| path.as_path()),
            declared,
        })?;
        info!(
            platform = %resolved.platform,
            source = %resolved.source,
            "resolved platform"
        );

        let overlay = match explicit {
            Some(found) => Some(found),
            None => self.platform_overlay(resolved)?,
        };

        let mut sources = Vec::new();
        let mut merged = Document::new();
        if let Some(base) = base {
            if overlay.as_ref().map_or(true, |(path, _)| *path != base_path) {
                sources.push(base_path.clone());
                merged = base;
            }
        }
        if let Some((path, doc)) = overlay {
            merged = merge_sections(merged, doc);
            sources.push(path);
        }
        if sources.is_empty() {
            return Err(PomError::config(format!(
                "no config file found in {}",
                self.config_dir.display()
            )));
        }
        debug!(?sources, "merged config files");

        let primary = sources.last().cloned().unwrap_or(base_path);
        self.build(merged, resolved, &primary)
            .map(|config| config.with_sources(sources))
    }

    fn platform_overlay(&self, resolved: ResolvedPlatform) -> PomResult<Option<(PathBuf, Document)>> {
        let path = self.platform_file(resolved.platform.file_token());
        if path.is_file() {
            let doc = read_document(&path)?;
            return Ok(Some((path, doc)));
        }
        if resolved.source.is_external() {
            return Err(PomError::config(format!(
                "platform {} selected by {} but {} does not exist",
                resolved.platform,
                resolved.source,
                path.display()
            )));
        }
        debug!(path = %path.display(), "no platform config file, using base only");
        Ok(None)
    }

    fn build(
        &self,
        mut merged: Document,
        resolved: ResolvedPlatform,
        primary: &Path,
    ) -> PomResult<AppConfig> {
        let parse_err = |source| PomError::Parse {
            path: primary.to_path_buf(),
            source,
        };
        let app: AppSection = section(&mut merged, "app").map_err(parse_err)?;
        let mut environment: EnvironmentSection =
            section(&mut merged, "environment").map_err(parse_err)?;
        let capabilities: Map<String, Value> =
            section(&mut merged, "capabilities").map_err(parse_err)?;

        if let Some(device) = self.device.as_ref().or(self.env_device.as_ref()) {
            if !device.trim().is_empty() {
                environment.device_name.clone_from(device);
            }
        }
        if resolved.source != PlatformSource::FileContent {
            environment.platform = Some(resolved.platform.as_str().to_string());
        }

        Ok(AppConfig::new(app, environment, capabilities, resolved))
    }
}

fn section<T: serde::de::DeserializeOwned + Default>(
    doc: &mut Document,
    name: &str,
) -> Result<T, serde_json::Error> {
    match doc.remove(name) {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => serde_json::from_value(value),
    }
}

fn declared_platform(doc: &Document) -> Option<&str> {
    doc.get("environment")?.get("platform")?.as_str()
}

fn read_document(path: &Path) -> PomResult<Document> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PomError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => PomError::Io(e),
    })?;
    serde_json::from_str(&text).map_err(|source| PomError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two config documents section by section.
///
/// When both sides hold an object under the same top-level key, the
/// override's keys replace the base's keys inside that section; nested
/// values are not merged further. Any other override value replaces the
/// base value outright.
#[must_use]
pub fn merge_sections(mut base: Document, overlay: Document) -> Document {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                existing.extend(incoming);
            }
            (_, value) => {
                let _ = base.insert(key, value);
            }
        }
    }
    base
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Platform;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn base() -> Value {
        json!({
            "app": {"build_number": "100", "version": "1.0.0", "package_name": "com.example.app"},
            "environment": {"platform": "Android", "device_name": "emulator-5554", "environment": "staging"},
            "capabilities": {"newCommandTimeout": 60, "noReset": false}
        })
    }

    fn ios() -> Value {
        json!({
            "app": {"bundle_id": "com.example.ios", "version": "1.0.1"},
            "environment": {"device_name": "iPhone 15", "server_url": "http://grid:4723"},
            "capabilities": {"noReset": true}
        })
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), DEFAULT_CONFIG_FILE, &base());
        write(dir.path(), "app_config_ios.json", &ios());
        dir
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn test_override_wins_per_key() {
            let merged = merge_sections(
                base().as_object().cloned().unwrap(),
                ios().as_object().cloned().unwrap(),
            );
            assert_eq!(merged["app"]["version"], "1.0.1");
            assert_eq!(merged["app"]["build_number"], "100");
            assert_eq!(merged["capabilities"]["noReset"], true);
            assert_eq!(merged["capabilities"]["newCommandTimeout"], 60);
        }

        #[test]
        fn test_merge_is_shallow() {
            let merged = merge_sections(
                json!({"environment": {"android_capabilities": {"a": 1, "b": 2}}})
                    .as_object()
                    .cloned()
                    .unwrap(),
                json!({"environment": {"android_capabilities": {"b": 3}}})
                    .as_object()
                    .cloned()
                    .unwrap(),
            );
            assert_eq!(
                merged["environment"]["android_capabilities"],
                json!({"b": 3})
            );
        }

        #[test]
        fn test_non_object_section_replaced() {
            let merged = merge_sections(
                json!({"capabilities": {"a": 1}}).as_object().cloned().unwrap(),
                json!({"capabilities": null}).as_object().cloned().unwrap(),
            );
            assert_eq!(merged["capabilities"], Value::Null);
        }
    }

    mod loader_tests {
        use super::*;

        #[test]
        fn test_platform_from_content_uses_base_only() {
            let dir = fixture();
            let config = ConfigLoader::new(dir.path()).load().unwrap();
            assert_eq!(config.platform(), Platform::Android);
            assert_eq!(config.platform_source(), PlatformSource::FileContent);
            assert_eq!(config.sources().len(), 1);
            assert_eq!(config.environment_name(), "staging");
            assert_eq!(config.capabilities()["newCommandTimeout"], 60);
        }

        #[test]
        fn test_explicit_platform_merges_override() {
            let dir = fixture();
            let config = ConfigLoader::new(dir.path())
                .with_platform("iOS")
                .load()
                .unwrap();
            assert_eq!(config.platform(), Platform::Ios);
            assert_eq!(config.platform_source(), PlatformSource::Explicit);
            assert_eq!(config.version(), "1.0.1");
            assert_eq!(config.build_number(), "100");
            assert_eq!(config.device(), "iPhone 15");
            assert_eq!(config.server_url(), "http://grid:4723");
            assert_eq!(config.sources().len(), 2);
            let caps = config.capabilities();
            assert_eq!(caps["platformName"], "iOS");
            assert_eq!(caps["noReset"], true);
        }

        #[test]
        fn test_env_platform_beats_content() {
            let dir = fixture();
            let config = ConfigLoader::new(dir.path())
                .with_env_platform(Some("ios".to_string()))
                .load()
                .unwrap();
            assert_eq!(config.platform(), Platform::Ios);
            assert_eq!(config.platform_source(), PlatformSource::Environment);
        }

        #[test]
        fn test_explicit_beats_env() {
            let dir = fixture();
            write(dir.path(), "app_config_android.json", &json!({}));
            let config = ConfigLoader::new(dir.path())
                .with_platform("android")
                .with_env_platform(Some("ios".to_string()))
                .load()
                .unwrap();
            assert_eq!(config.platform(), Platform::Android);
        }

        #[test]
        fn test_missing_platform_file_for_named_platform() {
            let dir = fixture();
            let err = ConfigLoader::new(dir.path())
                .with_platform("android")
                .load()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert!(err.to_string().contains("app_config_android.json"));
        }

        #[test]
        fn test_platform_from_file_name() {
            let dir = fixture();
            let config = ConfigLoader::new(dir.path())
                .with_config_file("app_config_ios.json")
                .load()
                .unwrap();
            assert_eq!(config.platform(), Platform::Ios);
            assert_eq!(config.platform_source(), PlatformSource::FileName);
            assert_eq!(config.sources().len(), 2);
        }

        #[test]
        fn test_missing_explicit_file() {
            let dir = fixture();
            let err = ConfigLoader::new(dir.path())
                .with_config_file("nope.json")
                .load()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }

        #[test]
        fn test_no_platform_anywhere() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), DEFAULT_CONFIG_FILE, &json!({"app": {}}));
            let err = ConfigLoader::new(dir.path()).load().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }

        #[test]
        fn test_no_config_files() {
            let dir = TempDir::new().unwrap();
            write(dir.path(), "app_config_ios.json", &ios());
            // platform file alone is enough
            let config = ConfigLoader::new(dir.path())
                .with_platform("ios")
                .load()
                .unwrap();
            assert_eq!(config.sources().len(), 1);

            let empty = TempDir::new().unwrap();
            let err = ConfigLoader::new(empty.path()).load().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }

        #[test]
        fn test_malformed_json() {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();
            let err = ConfigLoader::new(dir.path()).load().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse);
        }

        #[test]
        fn test_wrong_section_type_is_parse_error() {
            let dir = TempDir::new().unwrap();
            write(
                dir.path(),
                DEFAULT_CONFIG_FILE,
                &json!({"environment": {"platform": "android", "device_name": ["a", "b"]}}),
            );
            let err = ConfigLoader::new(dir.path()).load().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse);
        }

        #[test]
        fn test_numeric_platform_version_and_build_number() {
            let dir = TempDir::new().unwrap();
            write(
                dir.path(),
                DEFAULT_CONFIG_FILE,
                &json!({
                    "app": {"build_number": 100},
                    "environment": {"platform": "android", "platform_version": 14}
                }),
            );
            let config = ConfigLoader::new(dir.path()).load().unwrap();
            assert_eq!(config.build_number(), "100");
            assert_eq!(config.environment().platform_version, "14");
            assert_eq!(config.capabilities()["platformVersion"], "14");
        }

        #[test]
        fn test_device_override() {
            let dir = fixture();
            let config = ConfigLoader::new(dir.path())
                .with_env_device(Some("Pixel 9".to_string()))
                .load()
                .unwrap();
            assert_eq!(config.device(), "Pixel 9");
            assert_eq!(config.capabilities()["deviceName"], "Pixel 9");

            let config = ConfigLoader::new(dir.path())
                .with_env_device(Some("Pixel 9".to_string()))
                .with_device("Galaxy S24")
                .load()
                .unwrap();
            assert_eq!(config.device(), "Galaxy S24");
        }
    }
}
