//! Page Object Model support.
//!
//! A page object owns a [`BasePage`] and implements [`PageObject`]. Its
//! constructor ends with [`loaded`], so a page value only exists once the
//! screen is ready:
//!
//! ```
//! use appium_pom::{BasePage, Locator, MobileDriver, PageObject, PomResult, WaitOptions};
//!
//! struct LoginPage<'d, D: MobileDriver> {
//!     base: BasePage<'d, D>,
//! }
//!
//! impl<'d, D: MobileDriver> LoginPage<'d, D> {
//!     const USERNAME: &'static str = "com.example.app:id/username";
//!
//!     fn open(driver: &'d D, options: WaitOptions) -> PomResult<Self> {
//!         appium_pom::page::loaded(Self { base: BasePage::new(driver, options) })
//!     }
//! }
//!
//! impl<D: MobileDriver> PageObject for LoginPage<'_, D> {
//!     fn is_loaded(&self) -> PomResult<bool> {
//!         self.base.appium().is_displayed_now(&Locator::id(Self::USERNAME))
//!     }
//! }
//! ```

use crate::driver::MobileDriver;
use crate::error::PomResult;
use crate::wait::{poll, WaitOptions, WaitResult, WaitUtils};
use crate::wrapper::AppiumWrapper;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory screenshots are written to unless configured otherwise
pub const DEFAULT_SCREENSHOTS_DIR: &str = "screenshots";

/// Trait for page objects representing one screen of the app.
pub trait PageObject {
    /// Single, non-blocking readiness probe
    fn is_loaded(&self) -> PomResult<bool>;

    /// Page name for logging
    fn page_name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Options used by [`PageObject::wait_until_loaded`]
    fn load_options(&self) -> WaitOptions {
        WaitOptions::default()
    }

    /// Poll [`PageObject::is_loaded`] until it holds.
    ///
    /// # Errors
    ///
    /// [`crate::PomError::Timeout`] when the page never loads, or the first
    /// driver error raised by the probe.
    fn wait_until_loaded(&self) -> PomResult<WaitResult> {
        let options = self.load_options();
        let waited_for = format!("{} to load", self.page_name());
        let ((), elapsed) = poll(&waited_for, &options, || {
            Ok(self.is_loaded()?.then_some(()))
        })?;
        debug!(page = self.page_name(), ?elapsed, "page loaded");
        Ok(WaitResult {
            elapsed,
            waited_for,
        })
    }
}

/// Wait for a freshly built page to load and hand it back.
pub fn loaded<P: PageObject>(page: P) -> PomResult<P> {
    let _ = page.wait_until_loaded()?;
    Ok(page)
}

fn short_type_name(name: &str) -> &str {
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Shared state of every page: the wrapped driver and where screenshots go.
#[derive(Debug)]
pub struct BasePage<'d, D: MobileDriver> {
    appium: AppiumWrapper<'d, D>,
    screenshots_dir: PathBuf,
}

impl<'d, D: MobileDriver> BasePage<'d, D> {
    /// Base page writing screenshots to [`DEFAULT_SCREENSHOTS_DIR`]
    #[must_use]
    pub fn new(driver: &'d D, options: WaitOptions) -> Self {
        Self {
            appium: AppiumWrapper::new(driver, options),
            screenshots_dir: PathBuf::from(DEFAULT_SCREENSHOTS_DIR),
        }
    }

    /// Write screenshots elsewhere
    #[must_use]
    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    /// Wrapped driver
    #[must_use]
    pub const fn appium(&self) -> &AppiumWrapper<'d, D> {
        &self.appium
    }

    /// Explicit waits
    #[must_use]
    pub const fn waits(&self) -> &WaitUtils<'d, D> {
        self.appium.waits()
    }

    /// Raw driver
    #[must_use]
    pub const fn driver(&self) -> &'d D {
        self.appium.driver()
    }

    /// Screenshot directory
    #[must_use]
    pub fn screenshots_dir(&self) -> &Path {
        &self.screenshots_dir
    }

    /// Base page for the next screen, sharing driver, options and directory
    #[must_use]
    pub fn next_page(&self) -> Self {
        Self {
            appium: self.appium.clone(),
            screenshots_dir: self.screenshots_dir.clone(),
        }
    }

    /// Save a screenshot named `filename` into the screenshots directory
    pub fn take_screenshot(&self, filename: &str) -> PomResult<PathBuf> {
        self.appium
            .take_screenshot(self.screenshots_dir.join(filename))
    }
}
