//! `MobileDriver` - the seam between page objects and an Appium session.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  PageObject  │──▶│AppiumWrapper │──▶│ MobileDriver  │
//! │  (BasePage)  │   │  WaitUtils   │   │    (trait)    │
//! └──────────────┘   └──────────────┘   └───────┬───────┘
//!                                   ┌───────────┴───────────┐
//!                            ┌──────┴──────┐         ┌──────┴──────┐
//!                            │RemoteDriver │         │ MockDriver  │
//!                            │ (thirtyfour)│         │ (unit tests)│
//!                            └─────────────┘         └─────────────┘
//! ```
//!
//! Every method takes `&self` so that a page, its wrapper, and its waits can
//! all borrow the same driver. Lookups never wait: waiting is done by
//! [`crate::wait::WaitUtils`] with caller-supplied options.

use crate::error::{PomError, PomResult};
use crate::locator::{Locator, Point, Rect};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default swipe duration
pub const DEFAULT_SWIPE_MS: u64 = 1000;

/// Snapshot of an element taken when it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element id
    pub id: String,
    /// Text content
    pub text: Option<String>,
    /// Whether the element is displayed
    pub displayed: bool,
    /// Whether the element accepts input
    pub enabled: bool,
    /// On-screen rectangle
    pub rect: Option<Rect>,
}

impl ElementHandle {
    /// Displayed, enabled element without text
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            displayed: true,
            enabled: true,
            rect: None,
        }
    }

    /// Set the text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the displayed flag
    #[must_use]
    pub const fn displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set the enabled flag
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the rectangle
    #[must_use]
    pub const fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    /// Whether the element is visible
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.displayed
    }

    /// Whether the element is visible and enabled
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.displayed && self.enabled
    }

    /// Text content, empty when none
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Scroll direction of the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Reveal content above
    Up,
    /// Reveal content below
    Down,
    /// Reveal content to the left
    Left,
    /// Reveal content to the right
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// A straight-line swipe gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swipe {
    /// Start point
    pub start: Point,
    /// End point
    pub end: Point,
    /// Gesture duration in milliseconds
    pub duration_ms: u64,
}

impl Swipe {
    /// Swipe between two points with the default duration
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            duration_ms: DEFAULT_SWIPE_MS,
        }
    }

    /// Override the duration
    #[must_use]
    pub const fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Swipe across the middle half of a window that scrolls the content
    /// in `direction`.
    #[must_use]
    pub fn scroll(window: (u32, u32), direction: Direction) -> Self {
        let (w, h) = (i64::from(window.0), i64::from(window.1));
        let at = |x: i64, y: i64| {
            Point::new(
                i32::try_from(x).unwrap_or(i32::MAX),
                i32::try_from(y).unwrap_or(i32::MAX),
            )
        };
        let (start, end) = match direction {
            Direction::Down => (at(w / 2, h * 3 / 4), at(w / 2, h / 4)),
            Direction::Up => (at(w / 2, h / 4), at(w / 2, h * 3 / 4)),
            Direction::Left => (at(w * 3 / 4, h / 2), at(w / 4, h / 2)),
            Direction::Right => (at(w / 4, h / 2), at(w * 3 / 4, h / 2)),
        };
        Self::new(start, end)
    }
}

/// Synchronous interface to one Appium session.
pub trait MobileDriver {
    /// All elements currently matching the locator (no waiting)
    fn find_elements(&self, locator: &Locator) -> PomResult<Vec<ElementHandle>>;

    /// Whether a previously found element has left the view hierarchy
    fn is_stale(&self, element: &ElementHandle) -> PomResult<bool>;

    /// Tap an element
    fn click(&self, element: &ElementHandle) -> PomResult<()>;

    /// Clear an input element
    fn clear(&self, element: &ElementHandle) -> PomResult<()>;

    /// Type into an element
    fn send_keys(&self, element: &ElementHandle, text: &str) -> PomResult<()>;

    /// Perform a swipe gesture
    fn swipe(&self, swipe: &Swipe) -> PomResult<()>;

    /// Window size as `(width, height)`
    fn window_size(&self) -> PomResult<(u32, u32)>;

    /// PNG screenshot of the screen
    fn screenshot(&self) -> PomResult<Vec<u8>>;

    /// Dismiss the soft keyboard
    fn hide_keyboard(&self) -> PomResult<()>;

    /// Current Android activity
    fn current_activity(&self) -> PomResult<String>;

    /// Current Android package
    fn current_package(&self) -> PomResult<String>;

    /// Restart the app under test with fresh state.
    ///
    /// On Android the app's data is cleared before it is relaunched. iOS
    /// offers no data wipe for an installed app, so the reset there is a
    /// restart only and persisted state (keychain, defaults) survives.
    fn reset_app(&self) -> PomResult<()>;

    /// Send the app to the background for a while
    fn background_app(&self, duration: Duration) -> PomResult<()>;

    /// Device clock as reported by the device
    fn device_time(&self) -> PomResult<String>;

    /// End the session
    fn quit(&self) -> PomResult<()>;

    /// First element matching the locator, if any (no waiting)
    fn find_element(&self, locator: &Locator) -> PomResult<Option<ElementHandle>> {
        Ok(self.find_elements(locator)?.into_iter().next())
    }
}

impl<D: MobileDriver + ?Sized> MobileDriver for &D {
    fn find_elements(&self, locator: &Locator) -> PomResult<Vec<ElementHandle>> {
        (**self).find_elements(locator)
    }

    fn is_stale(&self, element: &ElementHandle) -> PomResult<bool> {
        (**self).is_stale(element)
    }

    fn click(&self, element: &ElementHandle) -> PomResult<()> {
        (**self).click(element)
    }

    fn clear(&self, element: &ElementHandle) -> PomResult<()> {
        (**self).clear(element)
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> PomResult<()> {
        (**self).send_keys(element, text)
    }

    fn swipe(&self, swipe: &Swipe) -> PomResult<()> {
        (**self).swipe(swipe)
    }

    fn window_size(&self) -> PomResult<(u32, u32)> {
        (**self).window_size()
    }

    fn screenshot(&self) -> PomResult<Vec<u8>> {
        (**self).screenshot()
    }

    fn hide_keyboard(&self) -> PomResult<()> {
        (**self).hide_keyboard()
    }

    fn current_activity(&self) -> PomResult<String> {
        (**self).current_activity()
    }

    fn current_package(&self) -> PomResult<String> {
        (**self).current_package()
    }

    fn reset_app(&self) -> PomResult<()> {
        (**self).reset_app()
    }

    fn background_app(&self, duration: Duration) -> PomResult<()> {
        (**self).background_app(duration)
    }

    fn device_time(&self) -> PomResult<String> {
        (**self).device_time()
    }

    fn quit(&self) -> PomResult<()> {
        (**self).quit()
    }
}

/// Effect of tapping a mock element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAction {
    /// Add an element to the view hierarchy
    Show(String),
    /// Remove an element from the view hierarchy
    Hide(String),
    /// Change an element's text
    SetText(String, String),
    /// Change the current activity
    SetActivity(String),
}

#[derive(Debug, Clone)]
struct MockElement {
    locator: Locator,
    handle: ElementHandle,
    present: bool,
    appear_after: u32,
    lookups: u32,
}

/// Scriptable in-memory driver for unit tests.
///
/// Elements are registered against a locator. An element can start hidden,
/// appear only after a number of lookups, and be shown or hidden by taps on
/// other elements, which is enough to model screen transitions.
#[derive(Debug)]
pub struct MockDriver {
    elements: RefCell<Vec<MockElement>>,
    on_click: RefCell<HashMap<String, Vec<MockAction>>>,
    call_history: RefCell<Vec<String>>,
    swipes: RefCell<Vec<Swipe>>,
    activity: RefCell<String>,
    package: String,
    window: (u32, u32),
    screenshot_data: Vec<u8>,
    failure: RefCell<Option<String>>,
    quit: Cell<bool>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            elements: RefCell::default(),
            on_click: RefCell::default(),
            call_history: RefCell::default(),
            swipes: RefCell::default(),
            activity: RefCell::new(".MainActivity".to_string()),
            package: "com.example.app".to_string(),
            window: (1080, 2340),
            screenshot_data: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
            failure: RefCell::default(),
            quit: Cell::new(false),
        }
    }
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a present element
    #[must_use]
    pub fn with_element(self, locator: Locator, handle: ElementHandle) -> Self {
        self.push(locator, handle, true, 0);
        self
    }

    /// Register an element that is absent until shown by a [`MockAction`]
    #[must_use]
    pub fn with_hidden_element(self, locator: Locator, handle: ElementHandle) -> Self {
        self.push(locator, handle, false, 0);
        self
    }

    /// Register an element that only matches after `lookups` lookups
    #[must_use]
    pub fn with_delayed_element(self, locator: Locator, handle: ElementHandle, lookups: u32) -> Self {
        self.push(locator, handle, true, lookups);
        self
    }

    /// Run actions when the element with this id is tapped
    #[must_use]
    pub fn on_click(self, element_id: &str, actions: Vec<MockAction>) -> Self {
        self.on_click
            .borrow_mut()
            .entry(element_id.to_string())
            .or_default()
            .extend(actions);
        self
    }

    /// Set the window size
    #[must_use]
    pub const fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window = (width, height);
        self
    }

    /// Set the screenshot bytes
    #[must_use]
    pub fn with_screenshot(mut self, data: Vec<u8>) -> Self {
        self.screenshot_data = data;
        self
    }

    /// Make every subsequent command fail with a driver error
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.borrow_mut() = Some(message.into());
    }

    /// Stop failing commands
    pub fn recover(&self) {
        *self.failure.borrow_mut() = None;
    }

    /// Apply an action directly, as if the app had changed on its own
    pub fn apply(&self, action: &MockAction) {
        let mut elements = self.elements.borrow_mut();
        match action {
            MockAction::Show(id) | MockAction::Hide(id) => {
                let present = matches!(action, MockAction::Show(_));
                for element in elements.iter_mut().filter(|e| e.handle.id == *id) {
                    element.present = present;
                }
            }
            MockAction::SetText(id, text) => {
                for element in elements.iter_mut().filter(|e| e.handle.id == *id) {
                    element.handle.text = Some(text.clone());
                }
            }
            MockAction::SetActivity(activity) => {
                *self.activity.borrow_mut() = activity.clone();
            }
        }
    }

    /// Current text of an element
    #[must_use]
    pub fn text_of(&self, element_id: &str) -> Option<String> {
        self.elements
            .borrow()
            .iter()
            .find(|e| e.handle.id == element_id)
            .and_then(|e| e.handle.text.clone())
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history.borrow().clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history
            .borrow()
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Number of calls to a method
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.call_history
            .borrow()
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }

    /// Swipes performed so far
    #[must_use]
    pub fn swipes(&self) -> Vec<Swipe> {
        self.swipes.borrow().clone()
    }

    /// Whether `quit` was called
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.quit.get()
    }

    fn push(&self, locator: Locator, handle: ElementHandle, present: bool, appear_after: u32) {
        self.elements.borrow_mut().push(MockElement {
            locator,
            handle,
            present,
            appear_after,
            lookups: 0,
        });
    }

    fn record(&self, call: String) -> PomResult<()> {
        self.call_history.borrow_mut().push(call);
        if self.quit.get() {
            return Err(PomError::driver("session has been quit"));
        }
        match self.failure.borrow().as_ref() {
            Some(message) => Err(PomError::driver(message.clone())),
            None => Ok(()),
        }
    }

    fn with_present<T>(
        &self,
        element: &ElementHandle,
        f: impl FnOnce(&mut MockElement) -> T,
    ) -> PomResult<T> {
        let mut elements = self.elements.borrow_mut();
        elements
            .iter_mut()
            .find(|e| e.handle.id == element.id && e.present)
            .map(f)
            .ok_or_else(|| PomError::driver(format!("stale element reference: {}", element.id)))
    }
}

impl MobileDriver for MockDriver {
    fn find_elements(&self, locator: &Locator) -> PomResult<Vec<ElementHandle>> {
        self.record(format!("find_elements:{locator}"))?;
        let mut elements = self.elements.borrow_mut();
        Ok(elements
            .iter_mut()
            .filter(|e| e.locator == *locator && e.present)
            .filter_map(|e| {
                e.lookups += 1;
                (e.lookups > e.appear_after).then(|| e.handle.clone())
            })
            .collect())
    }

    fn is_stale(&self, element: &ElementHandle) -> PomResult<bool> {
        self.record(format!("is_stale:{}", element.id))?;
        Ok(!self
            .elements
            .borrow()
            .iter()
            .any(|e| e.handle.id == element.id && e.present))
    }

    fn click(&self, element: &ElementHandle) -> PomResult<()> {
        self.record(format!("click:{}", element.id))?;
        self.with_present(element, |_| ())?;
        let actions = self
            .on_click
            .borrow()
            .get(&element.id)
            .cloned()
            .unwrap_or_default();
        for action in &actions {
            self.apply(action);
        }
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> PomResult<()> {
        self.record(format!("clear:{}", element.id))?;
        self.with_present(element, |e| e.handle.text = Some(String::new()))
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> PomResult<()> {
        self.record(format!("send_keys:{}", element.id))?;
        self.with_present(element, |e| {
            e.handle.text.get_or_insert_with(String::new).push_str(text);
        })
    }

    fn swipe(&self, swipe: &Swipe) -> PomResult<()> {
        self.record("swipe".to_string())?;
        self.swipes.borrow_mut().push(*swipe);
        Ok(())
    }

    fn window_size(&self) -> PomResult<(u32, u32)> {
        self.record("window_size".to_string())?;
        Ok(self.window)
    }

    fn screenshot(&self) -> PomResult<Vec<u8>> {
        self.record("screenshot".to_string())?;
        Ok(self.screenshot_data.clone())
    }

    fn hide_keyboard(&self) -> PomResult<()> {
        self.record("hide_keyboard".to_string())
    }

    fn current_activity(&self) -> PomResult<String> {
        self.record("current_activity".to_string())?;
        Ok(self.activity.borrow().clone())
    }

    fn current_package(&self) -> PomResult<String> {
        self.record("current_package".to_string())?;
        Ok(self.package.clone())
    }

    fn reset_app(&self) -> PomResult<()> {
        self.record("reset_app".to_string())
    }

    fn background_app(&self, duration: Duration) -> PomResult<()> {
        self.record(format!("background_app:{}", duration.as_secs()))
    }

    fn device_time(&self) -> PomResult<String> {
        self.record("device_time".to_string())?;
        Ok("2024-01-01T00:00:00+00:00".to_string())
    }

    fn quit(&self) -> PomResult<()> {
        self.record("quit".to_string())?;
        self.quit.set(true);
        Ok(())
    }
}
