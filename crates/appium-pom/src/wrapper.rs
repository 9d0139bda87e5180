//! High-level element operations built on [`WaitUtils`].

use crate::driver::{Direction, ElementHandle, MobileDriver, Swipe};
use crate::error::{PomError, PomResult};
use crate::locator::Locator;
use crate::wait::{WaitOptions, WaitUtils};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Timeout of each presence probe made by
/// [`AppiumWrapper::scroll_to_element`]
pub const SCROLL_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Driver wrapper whose lookups and actions wait explicitly.
#[derive(Debug)]
pub struct AppiumWrapper<'d, D: MobileDriver> {
    waits: WaitUtils<'d, D>,
    options: WaitOptions,
}

impl<D: MobileDriver> Clone for AppiumWrapper<'_, D> {
    fn clone(&self) -> Self {
        Self {
            waits: self.waits,
            options: self.options,
        }
    }
}

impl<'d, D: MobileDriver> AppiumWrapper<'d, D> {
    /// Wrapper using `options` for every wait
    #[must_use]
    pub const fn new(driver: &'d D, options: WaitOptions) -> Self {
        Self {
            waits: WaitUtils::new(driver),
            options,
        }
    }

    /// Same driver, other wait options
    #[must_use]
    pub const fn with_options(&self, options: WaitOptions) -> Self {
        Self {
            waits: self.waits,
            options,
        }
    }

    /// Wait options in use
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Underlying waits
    #[must_use]
    pub const fn waits(&self) -> &WaitUtils<'d, D> {
        &self.waits
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &'d D {
        self.waits.driver()
    }

    /// Find an element, waiting until it is visible (or only present).
    pub fn find_element(&self, locator: &Locator, wait_for_visible: bool) -> PomResult<ElementHandle> {
        if wait_for_visible {
            self.waits.wait_for_element_visible(locator, &self.options)
        } else {
            self.waits.wait_for_element_present(locator, &self.options)
        }
    }

    /// All matching elements; waits for at least one when `wait` is set.
    ///
    /// A timed-out wait yields an empty list.
    pub fn find_elements(&self, locator: &Locator, wait: bool) -> PomResult<Vec<ElementHandle>> {
        if wait {
            if let Err(e) = self.waits.wait_for_element_present(locator, &self.options) {
                return if e.is_timeout() { Ok(Vec::new()) } else { Err(e) };
            }
        }
        self.driver().find_elements(locator)
    }

    /// Find by resource id
    pub fn find_by_id(&self, id: &str, wait_for_visible: bool) -> PomResult<ElementHandle> {
        self.find_element(&Locator::id(id), wait_for_visible)
    }

    /// Find by XPath
    pub fn find_by_xpath(&self, xpath: &str, wait_for_visible: bool) -> PomResult<ElementHandle> {
        self.find_element(&Locator::xpath(xpath), wait_for_visible)
    }

    /// Find by accessibility id
    pub fn find_by_accessibility_id(
        &self,
        accessibility_id: &str,
        wait_for_visible: bool,
    ) -> PomResult<ElementHandle> {
        self.find_element(&Locator::accessibility_id(accessibility_id), wait_for_visible)
    }

    /// Find by class name
    pub fn find_by_class_name(&self, class_name: &str, wait_for_visible: bool) -> PomResult<ElementHandle> {
        self.find_element(&Locator::class_name(class_name), wait_for_visible)
    }

    /// Find by `UiSelector` expression
    pub fn find_by_android_uiautomator(
        &self,
        selector: &str,
        wait_for_visible: bool,
    ) -> PomResult<ElementHandle> {
        self.find_element(&Locator::android_uiautomator(selector), wait_for_visible)
    }

    /// Wait until clickable, then tap
    pub fn click(&self, locator: &Locator) -> PomResult<()> {
        let element = self.waits.wait_for_element_clickable(locator, &self.options)?;
        debug!(%locator, "click");
        self.driver().click(&element)
    }

    /// Wait until visible, then type (clearing the field first if asked)
    pub fn send_keys(&self, locator: &Locator, text: &str, clear_first: bool) -> PomResult<()> {
        let element = self.waits.wait_for_element_visible(locator, &self.options)?;
        if clear_first {
            self.driver().clear(&element)?;
        }
        self.driver().send_keys(&element, text)
    }

    /// Text of a visible element
    pub fn get_text(&self, locator: &Locator) -> PomResult<String> {
        Ok(self.find_element(locator, true)?.text().to_string())
    }

    /// Whether the element shows up within the timeout
    pub fn is_element_present(&self, locator: &Locator) -> PomResult<bool> {
        Self::timeout_as_false(self.waits.wait_for_element_present(locator, &self.options))
    }

    /// Whether the element becomes visible within the timeout
    pub fn is_element_visible(&self, locator: &Locator) -> PomResult<bool> {
        Self::timeout_as_false(self.waits.wait_for_element_visible(locator, &self.options))
    }

    /// Whether the element becomes clickable within the timeout
    pub fn is_element_clickable(&self, locator: &Locator) -> PomResult<bool> {
        Self::timeout_as_false(self.waits.wait_for_element_clickable(locator, &self.options))
    }

    /// Single probe: is a matching element displayed right now
    pub fn is_displayed_now(&self, locator: &Locator) -> PomResult<bool> {
        Ok(self
            .driver()
            .find_elements(locator)?
            .iter()
            .any(ElementHandle::is_visible))
    }

    /// Perform a swipe
    pub fn swipe(&self, swipe: &Swipe) -> PomResult<()> {
        self.driver().swipe(swipe)
    }

    /// Swipe in `direction` until the element is present, at most
    /// `max_swipes` times. `None` when it never shows up.
    pub fn scroll_to_element(
        &self,
        locator: &Locator,
        direction: Direction,
        max_swipes: u32,
    ) -> PomResult<Option<ElementHandle>> {
        let probe_timeout = SCROLL_PROBE_TIMEOUT_MS.min(self.options.timeout_ms);
        let probe = self.with_options(self.options.with_timeout(probe_timeout));
        for attempt in 0..max_swipes {
            if probe.is_element_present(locator)? {
                return probe.find_element(locator, false).map(Some);
            }
            let window = self.driver().window_size()?;
            debug!(%locator, %direction, attempt, "scrolling");
            self.swipe(&Swipe::scroll(window, direction))?;
        }
        Ok(None)
    }

    /// Dismiss the soft keyboard
    pub fn hide_keyboard(&self) -> PomResult<()> {
        self.driver().hide_keyboard()
    }

    /// Current Android activity
    pub fn current_activity(&self) -> PomResult<String> {
        self.driver().current_activity()
    }

    /// Current Android package
    pub fn current_package(&self) -> PomResult<String> {
        self.driver().current_package()
    }

    /// Restart the app with fresh state
    pub fn reset_app(&self) -> PomResult<()> {
        self.driver().reset_app()
    }

    /// Background the app for `seconds`
    pub fn background_app(&self, seconds: u64) -> PomResult<()> {
        self.driver().background_app(Duration::from_secs(seconds))
    }

    /// Device clock
    pub fn device_time(&self) -> PomResult<String> {
        self.driver().device_time()
    }

    /// Save a PNG screenshot, creating parent directories.
    pub fn take_screenshot(&self, path: impl AsRef<Path>) -> PomResult<PathBuf> {
        let path = path.as_ref();
        let png = self.driver().screenshot()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, png)?;
        info!(path = %path.display(), "saved screenshot");
        Ok(path.to_path_buf())
    }

    fn timeout_as_false<T>(result: PomResult<T>) -> PomResult<bool> {
        match result {
            Ok(_) => Ok(true),
            Err(PomError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockAction, MockDriver};
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn fast() -> WaitOptions {
        WaitOptions::new().with_timeout(100).with_poll_interval(5)
    }

    fn login_screen() -> MockDriver {
        MockDriver::new()
            .with_element(Locator::id("username"), ElementHandle::new("username").with_text("old"))
            .with_element(Locator::accessibility_id("login"), ElementHandle::new("login"))
            .with_element(Locator::id("disabled"), ElementHandle::new("disabled").enabled(false))
            .with_hidden_element(Locator::id("welcome"), ElementHandle::new("welcome").with_text("Hi"))
            .on_click("login", vec![MockAction::Show("welcome".into())])
    }

    mod find_tests {
        use super::*;

        #[test]
        fn test_find_helpers() {
            let driver = login_screen();
            let wrapper = AppiumWrapper::new(&driver, fast());
            assert_eq!(wrapper.find_by_id("username", true).unwrap().id, "username");
            assert_eq!(wrapper.find_by_accessibility_id("login", true).unwrap().id, "login");
            assert!(wrapper.find_by_xpath("//nothing", false).unwrap_err().is_timeout());
        }

        #[test]
        fn test_find_elements_empty_on_timeout() {
            let driver = login_screen();
            let wrapper = AppiumWrapper::new(&driver, fast());
            assert!(wrapper.find_elements(&Locator::id("welcome"), true).unwrap().is_empty());
            assert_eq!(wrapper.find_elements(&Locator::id("username"), false).unwrap().len(), 1);
        }
    }

    mod interaction_tests {
        use super::*;

        #[test]
        fn test_send_keys_clears_first() {
            let driver = login_screen();
            let wrapper = AppiumWrapper::new(&driver, fast());
            wrapper.send_keys(&Locator::id("username"), "alice", true).unwrap();
            assert_eq!(driver.text_of("username").as_deref(), Some("alice"));
            wrapper.send_keys(&Locator::id("username"), "!", false).unwrap();
            assert_eq!(wrapper.get_text(&Locator::id("username")).unwrap(), "alice!");
        }

        #[test]
        fn test_click_reveals_welcome() {
            let driver = login_screen();
            let wrapper = AppiumWrapper::new(&driver, fast());
            assert!(!wrapper.is_displayed_now(&Locator::id("welcome")).unwrap());
            wrapper.click(&Locator::accessibility_id("login")).unwrap();
            assert!(wrapper.is_element_visible(&Locator::id("welcome")).unwrap());
            assert_eq!(wrapper.get_text(&Locator::id("welcome")).unwrap(), "Hi");
        }

        #[test]
        fn test_click_disabled_times_out() {
            let driver = login_screen();
            let wrapper = AppiumWrapper::new(&driver, fast());
            assert!(wrapper.is_element_present(&Locator::id("disabled")).unwrap());
            assert!(!wrapper.is_element_clickable(&Locator::id("disabled")).unwrap());
            assert!(wrapper.click(&Locator::id("disabled")).unwrap_err().is_timeout());
            assert!(!driver.was_called("click"));
        }

        #[test]
        fn test_bool_probes_propagate_driver_errors() {
            let driver = login_screen();
            driver.fail_with("connection refused");
            let wrapper = AppiumWrapper::new(&driver, fast());
            let err = wrapper.is_element_present(&Locator::id("username")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Driver);
        }
    }

    mod scroll_tests {
        use super::*;

        #[test]
        fn test_scroll_finds_delayed_element() {
            let driver = MockDriver::new()
                .with_window_size(1000, 2000)
                .with_hidden_element(Locator::id("footer"), ElementHandle::new("footer"));
            let wrapper = AppiumWrapper::new(&driver, WaitOptions::new().with_timeout(0));
            assert!(wrapper
                .scroll_to_element(&Locator::id("footer"), Direction::Down, 3)
                .unwrap()
                .is_none());
            assert_eq!(driver.swipes().len(), 3);
            assert_eq!(driver.swipes()[0], Swipe::scroll((1000, 2000), Direction::Down));

            driver.apply(&MockAction::Show("footer".into()));
            let found = wrapper
                .scroll_to_element(&Locator::id("footer"), Direction::Down, 3)
                .unwrap();
            assert_eq!(found.map(|e| e.id), Some("footer".to_string()));
            assert_eq!(driver.swipes().len(), 3);
        }
    }

    mod device_tests {
        use super::*;

        #[test]
        fn test_app_commands_pass_through() {
            let driver = MockDriver::new();
            let wrapper = AppiumWrapper::new(&driver, fast());
            assert_eq!(wrapper.current_activity().unwrap(), ".MainActivity");
            assert_eq!(wrapper.current_package().unwrap(), "com.example.app");
            wrapper.hide_keyboard().unwrap();
            wrapper.reset_app().unwrap();
            wrapper.background_app(3).unwrap();
            assert!(!wrapper.device_time().unwrap().is_empty());
            assert!(driver.history().contains(&"background_app:3".to_string()));
        }

        #[test]
        fn test_screenshot_creates_directories() {
            let dir = TempDir::new().unwrap();
            let driver = MockDriver::new().with_screenshot(vec![1, 2, 3]);
            let wrapper = AppiumWrapper::new(&driver, fast());
            let path = dir.path().join("shots/nested/login.png");
            let saved = wrapper.take_screenshot(&path).unwrap();
            assert_eq!(std::fs::read(saved).unwrap(), vec![1, 2, 3]);
        }
    }
}
