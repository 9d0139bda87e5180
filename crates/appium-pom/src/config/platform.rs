//! Platform selection.
//!
//! A platform can be named in four places. They are consulted in a fixed
//! order and the first one present wins:
//!
//! 1. an explicit setting on the loader (`ConfigLoader::with_platform`)
//! 2. the `APPIUM_PLATFORM` environment variable
//! 3. a platform token in an explicitly supplied config file name
//!    (`app_config_ios.json`)
//! 4. the `environment.platform` field of the config file itself
//!
//! A source that is present but names an unknown platform is an error; it
//! never falls through to a lower-priority source.

use crate::error::{PomError, PomResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Mobile platform under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Android (UiAutomator2)
    Android,
    /// iOS (XCUITest)
    #[serde(rename = "iOS")]
    Ios,
}

impl Platform {
    /// Value sent as the `platformName` capability
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "Android",
            Self::Ios => "iOS",
        }
    }

    /// Lowercase token used in platform config file names
    #[must_use]
    pub const fn file_token(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Automation engine used when the config does not name one
    #[must_use]
    pub const fn default_automation_name(self) -> &'static str {
        match self {
            Self::Android => "UiAutomator2",
            Self::Ios => "XCUITest",
        }
    }

    /// Parse a platform name, ignoring case and surrounding whitespace
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            _ => None,
        }
    }

    /// Find a platform token in a file name such as `app_config_ios.json`
    #[must_use]
    pub fn from_file_name(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        stem.split(['_', '-', '.']).find_map(Self::parse)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PomError::config(format!("unknown platform `{s}`")))
    }
}

/// Where the platform was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformSource {
    /// Set explicitly on the loader
    Explicit,
    /// `APPIUM_PLATFORM` environment variable
    Environment,
    /// Token in the supplied config file name
    FileName,
    /// `environment.platform` declared in the config file
    FileContent,
}

impl PlatformSource {
    /// Human-readable description
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Explicit => "explicit setting",
            Self::Environment => "environment variable APPIUM_PLATFORM",
            Self::FileName => "config file name",
            Self::FileContent => "environment.platform in config file",
        }
    }

    /// Whether the platform was named outside the config files
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::Explicit | Self::Environment)
    }
}

impl fmt::Display for PlatformSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A platform together with the source that selected it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPlatform {
    /// Selected platform
    pub platform: Platform,
    /// Source that selected it
    pub source: PlatformSource,
}

/// Inputs to [`resolve_platform`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformHints<'a> {
    /// Explicit setting
    pub explicit: Option<&'a str>,
    /// Value of `APPIUM_PLATFORM`
    pub env: Option<&'a str>,
    /// Explicitly supplied config file
    pub file_name: Option<&'a Path>,
    /// `environment.platform` from the config content
    pub declared: Option<&'a str>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn named(value: &str, source: PlatformSource) -> PomResult<ResolvedPlatform> {
    Platform::parse(value)
        .map(|platform| ResolvedPlatform { platform, source })
        .ok_or_else(|| PomError::config(format!("unknown platform `{value}` from {source}")))
}

/// Pick the platform from the highest-priority source that names one.
pub fn resolve_platform(hints: &PlatformHints<'_>) -> PomResult<ResolvedPlatform> {
    if let Some(value) = present(hints.explicit) {
        return named(value, PlatformSource::Explicit);
    }
    if let Some(value) = present(hints.env) {
        return named(value, PlatformSource::Environment);
    }
    if let Some(platform) = hints.file_name.and_then(Platform::from_file_name) {
        return Ok(ResolvedPlatform {
            platform,
            source: PlatformSource::FileName,
        });
    }
    if let Some(value) = present(hints.declared) {
        return named(value, PlatformSource::FileContent);
    }
    Err(PomError::config(
        "no platform could be determined: set APPIUM_PLATFORM, pass a platform, \
         or declare environment.platform in the config file",
    ))
}
