//! Per-test run context.
//!
//! A [`RunContext`] is what a test builds first: it loads the merged config
//! once, owns a data loader (and so its own cache) and resolves the test's
//! case from the function name.
//!
//! ```no_run
//! use appium_pom::{test_fn_name, RunContext, Settings};
//!
//! fn test_successful_login() -> appium_pom::PomResult<()> {
//!     let mut ctx = RunContext::new(Settings::from_env())?;
//!     let case = ctx.test_case(test_fn_name!())?;
//!     assert_eq!(case.name, "valid_login");
//!     Ok(())
//! }
//! ```

use crate::config::{AppConfig, ConfigLoader, DEVICE_ENV, PLATFORM_ENV};
use crate::data::{TestCase, TestDataLoader, DEFAULT_DATA_DIR, TEST_ENV};
use crate::driver::MobileDriver;
use crate::error::PomResult;
use crate::page::{BasePage, DEFAULT_SCREENSHOTS_DIR};
use crate::resolve::{CaseResolver, Resolution};
use crate::session::{Session, SessionFactory};
use crate::wait::WaitOptions;
use std::path::PathBuf;
use tracing::debug;

/// Default config directory
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Locations and defaults for one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding `app_config*.json`
    pub config_dir: PathBuf,
    /// Explicit platform config file
    pub config_file: Option<PathBuf>,
    /// Explicitly selected platform
    pub platform: Option<String>,
    /// Value of `APPIUM_PLATFORM`
    pub env_platform: Option<String>,
    /// Value of `APPIUM_DEVICE`
    pub env_device: Option<String>,
    /// Directory holding test-data files
    pub data_dir: PathBuf,
    /// Directory screenshots are written to
    pub screenshots_dir: PathBuf,
    /// Active test-data environment (`TEST_ENV`)
    pub environment: Option<String>,
    /// Fallback test-data environment
    pub default_environment: String,
    /// Wait options handed to pages
    pub wait: WaitOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            platform: None,
            env_platform: None,
            env_device: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            screenshots_dir: PathBuf::from(DEFAULT_SCREENSHOTS_DIR),
            environment: None,
            default_environment: crate::config::DEFAULT_ENVIRONMENT.to_string(),
            wait: WaitOptions::default(),
        }
    }
}

impl Settings {
    /// Defaults plus `APPIUM_PLATFORM`, `APPIUM_DEVICE` and `TEST_ENV`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            env_platform: std::env::var(PLATFORM_ENV).ok(),
            env_device: std::env::var(DEVICE_ENV).ok(),
            environment: std::env::var(TEST_ENV).ok(),
            ..Self::default()
        }
    }

    /// Set the config directory
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Set the data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the screenshots directory
    #[must_use]
    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    /// Select the platform explicitly
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the active test-data environment
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Set the wait options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Config loader for these settings
    #[must_use]
    pub fn config_loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new(&self.config_dir)
            .with_env_platform(self.env_platform.clone())
            .with_env_device(self.env_device.clone());
        if let Some(platform) = &self.platform {
            loader = loader.with_platform(platform.clone());
        }
        if let Some(file) = &self.config_file {
            loader = loader.with_config_file(file.clone());
        }
        loader
    }
}

/// Config, data and name resolution for one test.
#[derive(Debug)]
pub struct RunContext {
    settings: Settings,
    config: AppConfig,
    data: TestDataLoader,
    resolver: CaseResolver,
}

impl RunContext {
    /// Load the config and set up an empty data cache.
    ///
    /// The data environment is `TEST_ENV` when set, else the config's
    /// `environment.environment`.
    pub fn new(settings: Settings) -> PomResult<Self> {
        let config = settings.config_loader().load()?;
        let environment = settings
            .environment
            .clone()
            .unwrap_or_else(|| config.environment_name().to_string());
        debug!(%environment, data_dir = %settings.data_dir.display(), "run context ready");
        let data = TestDataLoader::new(&settings.data_dir)
            .with_default_environment(settings.default_environment.clone())
            .with_environment(Some(environment));
        Ok(Self {
            settings,
            config,
            data,
            resolver: CaseResolver::new(),
        })
    }

    /// Settings the context was built from
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Merged configuration
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Test-data loader
    pub fn data(&mut self) -> &mut TestDataLoader {
        &mut self.data
    }

    /// Name resolver, for bindings and custom substitutions
    pub fn resolver_mut(&mut self) -> &mut CaseResolver {
        &mut self.resolver
    }

    /// Which case a test resolves to
    pub fn resolve(&mut self, test_name: &str) -> PomResult<Resolution> {
        self.resolver.resolve(test_name, &mut self.data)
    }

    /// Layered data of the case a test resolves to
    pub fn test_case(&mut self, test_name: &str) -> PomResult<TestCase> {
        let resolution = self.resolve(test_name)?;
        self.data
            .get_test_case_data(&resolution.data_file, &resolution.case)
    }

    /// Open a driver session for this test
    pub fn start_session<F: SessionFactory>(&self, factory: &F) -> PomResult<Session<F::Driver>> {
        Session::start(factory, &self.config)
    }

    /// Base page configured with this context's wait options and screenshot
    /// directory
    #[must_use]
    pub fn base_page<'d, D: MobileDriver>(&self, driver: &'d D) -> BasePage<'d, D> {
        BasePage::new(driver, self.settings.wait).with_screenshots_dir(&self.settings.screenshots_dir)
    }
}
