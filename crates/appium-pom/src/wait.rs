//! Explicit waits.
//!
//! Every wait takes the [`WaitOptions`] it runs under; nothing here relies on
//! a session-level implicit wait. Conditions are polled on the calling thread
//! and checked at least once, even with a zero timeout. Driver errors raised
//! while polling end the wait immediately.

use crate::driver::{ElementHandle, MobileDriver};
use crate::error::{PomError, PomResult};
use crate::locator::Locator;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (500ms, Selenium's `WebDriverWait` default)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Trait for custom wait conditions
pub trait WaitCondition {
    /// Check if the condition is satisfied
    fn check(&self) -> PomResult<bool>;

    /// Get description for error messages
    fn description(&self) -> String;
}

/// A function-based wait condition
pub struct FnCondition<F: Fn() -> PomResult<bool>> {
    func: F,
    description: String,
}

impl<F: Fn() -> PomResult<bool>> std::fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnCondition")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F: Fn() -> PomResult<bool>> FnCondition<F> {
    /// Create a new function condition
    pub fn new(func: F, description: impl Into<String>) -> Self {
        Self {
            func,
            description: description.into(),
        }
    }
}

impl<F: Fn() -> PomResult<bool>> WaitCondition for FnCondition<F> {
    fn check(&self) -> PomResult<bool> {
        (self.func)()
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}

/// Result of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Poll `probe` until it yields a value or the timeout is spent.
///
/// # Errors
///
/// [`PomError::Timeout`] when the budget runs out, or the first error the
/// probe returns.
pub fn poll<T>(
    waited_for: &str,
    options: &WaitOptions,
    mut probe: impl FnMut() -> PomResult<Option<T>>,
) -> PomResult<(T, Duration)> {
    let start = Instant::now();
    let timeout = options.timeout();
    loop {
        if let Some(value) = probe()? {
            return Ok((value, start.elapsed()));
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            debug!(
                waited_for,
                timeout_ms = options.timeout_ms,
                "wait timed out"
            );
            return Err(PomError::Timeout {
                ms: options.timeout_ms,
                waited_for: waited_for.to_string(),
            });
        }
        std::thread::sleep(options.poll_interval().min(timeout - elapsed));
    }
}

/// Explicit waits against one driver
#[derive(Debug)]
pub struct WaitUtils<'d, D: MobileDriver> {
    driver: &'d D,
}

impl<D: MobileDriver> Clone for WaitUtils<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: MobileDriver> Copy for WaitUtils<'_, D> {}

impl<'d, D: MobileDriver> WaitUtils<'d, D> {
    /// Waits for a driver
    #[must_use]
    pub const fn new(driver: &'d D) -> Self {
        Self { driver }
    }

    /// The driver being polled
    #[must_use]
    pub const fn driver(&self) -> &'d D {
        self.driver
    }

    /// Wait for a custom condition
    pub fn wait_for<C: WaitCondition>(
        &self,
        condition: &C,
        options: &WaitOptions,
    ) -> PomResult<WaitResult> {
        let waited_for = condition.description();
        let ((), elapsed) = poll(&waited_for, options, || {
            Ok(condition.check()?.then_some(()))
        })?;
        Ok(WaitResult {
            elapsed,
            waited_for,
        })
    }

    /// Wait for an infallible predicate to return true
    pub fn wait_until<F>(
        &self,
        predicate: F,
        description: &str,
        options: &WaitOptions,
    ) -> PomResult<WaitResult>
    where
        F: Fn() -> bool,
    {
        self.wait_for(&FnCondition::new(|| Ok(predicate()), description), options)
    }

    /// Wait until at least one element matches
    pub fn wait_for_element_present(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> PomResult<ElementHandle> {
        let (element, _) = poll(&format!("presence of {locator}"), options, || {
            self.driver.find_element(locator)
        })?;
        Ok(element)
    }

    /// Wait until a matching element is displayed
    pub fn wait_for_element_visible(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> PomResult<ElementHandle> {
        self.first_matching(locator, "visibility", options, ElementHandle::is_visible)
    }

    /// Wait until a matching element is displayed and enabled
    pub fn wait_for_element_clickable(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> PomResult<ElementHandle> {
        self.first_matching(locator, "clickability", options, ElementHandle::is_clickable)
    }

    /// Wait until nothing matches
    pub fn wait_for_element_not_present(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> PomResult<WaitResult> {
        let waited_for = format!("absence of {locator}");
        let ((), elapsed) = poll(&waited_for, options, || {
            Ok(self.driver.find_elements(locator)?.is_empty().then_some(()))
        })?;
        Ok(WaitResult {
            elapsed,
            waited_for,
        })
    }

    /// Wait until no matching element is displayed (absent counts)
    pub fn wait_for_element_not_visible(
        &self,
        locator: &Locator,
        options: &WaitOptions,
    ) -> PomResult<WaitResult> {
        let waited_for = format!("invisibility of {locator}");
        let ((), elapsed) = poll(&waited_for, options, || {
            let visible = self
                .driver
                .find_elements(locator)?
                .iter()
                .any(ElementHandle::is_visible);
            Ok((!visible).then_some(()))
        })?;
        Ok(WaitResult {
            elapsed,
            waited_for,
        })
    }

    /// Wait until the first matching element's text contains `text`
    pub fn wait_for_text_in_element(
        &self,
        locator: &Locator,
        text: &str,
        options: &WaitOptions,
    ) -> PomResult<ElementHandle> {
        let (element, _) = poll(&format!("text {text:?} in {locator}"), options, || {
            Ok(self
                .driver
                .find_element(locator)?
                .filter(|e| e.text().contains(text)))
        })?;
        Ok(element)
    }

    /// Wait until a previously found element leaves the view hierarchy
    pub fn wait_for_staleness(
        &self,
        element: &ElementHandle,
        options: &WaitOptions,
    ) -> PomResult<WaitResult> {
        let waited_for = format!("staleness of element {}", element.id);
        let ((), elapsed) = poll(&waited_for, options, || {
            Ok(self.driver.is_stale(element)?.then_some(()))
        })?;
        Ok(WaitResult {
            elapsed,
            waited_for,
        })
    }

    fn first_matching(
        &self,
        locator: &Locator,
        what: &str,
        options: &WaitOptions,
        accept: fn(&ElementHandle) -> bool,
    ) -> PomResult<ElementHandle> {
        let (element, _) = poll(&format!("{what} of {locator}"), options, || {
            Ok(self
                .driver
                .find_elements(locator)?
                .into_iter()
                .find(|e| accept(e)))
        })?;
        Ok(element)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockAction, MockDriver};
    use crate::error::ErrorKind;
    use std::cell::Cell;

    fn fast() -> WaitOptions {
        WaitOptions::new().with_timeout(200).with_poll_interval(5)
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_wait_options_default() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_wait_options_builder() {
            let opts = WaitOptions::new().with_timeout(5000).with_poll_interval(10);
            assert_eq!(opts.timeout(), Duration::from_secs(5));
            assert_eq!(opts.poll_interval(), Duration::from_millis(10));
        }
    }

    mod poll_tests {
        use super::*;

        #[test]
        fn test_zero_timeout_checks_once() {
            let calls = Cell::new(0);
            let opts = WaitOptions::new().with_timeout(0);
            let (value, _) = poll("ready", &opts, || {
                calls.set(calls.get() + 1);
                Ok(Some(7))
            })
            .unwrap();
            assert_eq!(value, 7);
            assert_eq!(calls.get(), 1);
        }

        #[test]
        fn test_timeout_error_describes_condition() {
            let opts = WaitOptions::new().with_timeout(20).with_poll_interval(5);
            let err = poll::<()>("the moon", &opts, || Ok(None)).unwrap_err();
            assert!(err.is_timeout());
            assert_eq!(err.to_string(), "Timed out after 20ms waiting for the moon");
        }

        #[test]
        fn test_probe_error_stops_polling() {
            let calls = Cell::new(0);
            let err = poll::<()>("x", &fast(), || {
                calls.set(calls.get() + 1);
                Err(PomError::driver("boom"))
            })
            .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Driver);
            assert_eq!(calls.get(), 1);
        }
    }

    mod element_wait_tests {
        use super::*;

        #[test]
        fn test_present_after_a_few_polls() {
            let driver = MockDriver::new().with_delayed_element(
                Locator::id("list"),
                ElementHandle::new("list"),
                3,
            );
            let waits = WaitUtils::new(&driver);
            let found = waits
                .wait_for_element_present(&Locator::id("list"), &fast())
                .unwrap();
            assert_eq!(found.id, "list");
            assert_eq!(driver.call_count("find_elements"), 4);
        }

        #[test]
        fn test_visible_skips_hidden_matches() {
            let driver = MockDriver::new()
                .with_element(Locator::id("row"), ElementHandle::new("r1").displayed(false))
                .with_element(Locator::id("row"), ElementHandle::new("r2"));
            let found = WaitUtils::new(&driver)
                .wait_for_element_visible(&Locator::id("row"), &fast())
                .unwrap();
            assert_eq!(found.id, "r2");
        }

        #[test]
        fn test_clickable_times_out_on_disabled() {
            let driver = MockDriver::new()
                .with_element(Locator::id("submit"), ElementHandle::new("s").enabled(false));
            let err = WaitUtils::new(&driver)
                .wait_for_element_clickable(&Locator::id("submit"), &fast())
                .unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("clickability of id=\"submit\""));
        }

        #[test]
        fn test_not_present_and_not_visible() {
            let driver = MockDriver::new()
                .with_element(Locator::id("toast"), ElementHandle::new("t").displayed(false));
            let waits = WaitUtils::new(&driver);
            assert!(waits
                .wait_for_element_not_visible(&Locator::id("toast"), &fast())
                .is_ok());
            assert!(waits
                .wait_for_element_not_present(&Locator::id("toast"), &fast())
                .unwrap_err()
                .is_timeout());
            driver.apply(&MockAction::Hide("t".into()));
            assert!(waits
                .wait_for_element_not_present(&Locator::id("toast"), &fast())
                .is_ok());
        }

        #[test]
        fn test_text_in_element() {
            let driver = MockDriver::new().with_element(
                Locator::id("status"),
                ElementHandle::new("status").with_text("Welcome, alice"),
            );
            let waits = WaitUtils::new(&driver);
            assert!(waits
                .wait_for_text_in_element(&Locator::id("status"), "alice", &fast())
                .is_ok());
            assert!(waits
                .wait_for_text_in_element(&Locator::id("status"), "bob", &fast())
                .unwrap_err()
                .is_timeout());
        }

        #[test]
        fn test_staleness() {
            let driver = MockDriver::new().with_element(Locator::id("a"), ElementHandle::new("a"));
            let waits = WaitUtils::new(&driver);
            let element = driver.find_element(&Locator::id("a")).unwrap().unwrap();
            assert!(waits.wait_for_staleness(&element, &fast()).unwrap_err().is_timeout());
            driver.apply(&MockAction::Hide("a".into()));
            let result = waits.wait_for_staleness(&element, &fast()).unwrap();
            assert!(result.waited_for.contains("staleness"));
        }

        #[test]
        fn test_driver_error_propagates() {
            let driver = MockDriver::new();
            driver.fail_with("session not created");
            let err = WaitUtils::new(&driver)
                .wait_for_element_present(&Locator::id("x"), &fast())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Driver);
        }
    }

    mod custom_condition_tests {
        use super::*;

        #[test]
        fn test_wait_until_counts_polls() {
            let driver = MockDriver::new();
            let counter = Cell::new(0);
            let result = WaitUtils::new(&driver)
                .wait_until(
                    || {
                        counter.set(counter.get() + 1);
                        counter.get() >= 3
                    },
                    "third poll",
                    &fast(),
                )
                .unwrap();
            assert_eq!(counter.get(), 3);
            assert_eq!(result.waited_for, "third poll");
        }

        #[test]
        fn test_fn_condition_debug() {
            let condition = FnCondition::new(|| Ok(true), "always");
            assert!(format!("{condition:?}").contains("always"));
            assert!(condition.check().unwrap());
        }
    }
}
