//! [`MobileDriver`] backed by a real Appium server via `thirtyfour`.
//!
//! `thirtyfour` is async; each command is driven to completion on a
//! current-thread runtime owned by the driver. Locators are sent as XPath
//! (see [`Locator::to_xpath`]) and Appium-only commands go through `mobile:`
//! script extensions. Session timeouts are never touched, so implicit waits
//! stay at the server default of zero.

use crate::config::{AppConfig, Platform};
use crate::driver::{ElementHandle, MobileDriver, Swipe};
use crate::error::{PomError, PomResult};
use crate::locator::Locator;
use crate::session::{w3c_capabilities, SessionFactory};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thirtyfour::error::WebDriverResult;
use thirtyfour::{By, WebDriver, WebElement};
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Driver for one remote Appium session
pub struct RemoteDriver {
    runtime: Runtime,
    driver: WebDriver,
    platform: Platform,
    app_id: Option<String>,
    elements: RefCell<HashMap<String, WebElement>>,
}

impl std::fmt::Debug for RemoteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteDriver")
            .field("platform", &self.platform)
            .field("app_id", &self.app_id)
            .field("cached_elements", &self.elements.borrow().len())
            .finish_non_exhaustive()
    }
}

impl RemoteDriver {
    /// Open a session on the configured server with the configured
    /// capabilities.
    pub fn connect(config: &AppConfig) -> PomResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let caps = w3c_capabilities(&config.capabilities());
        debug!(?caps, "creating session");
        let driver = runtime
            .block_on(WebDriver::new(config.server_url(), caps))
            .map_err(to_pom)?;
        info!(server = config.server_url(), platform = %config.platform(), "session created");
        Ok(Self {
            runtime,
            driver,
            platform: config.platform(),
            app_id: config.app_id().map(str::to_string),
            elements: RefCell::new(HashMap::new()),
        })
    }

    /// Platform of the session
    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    fn run<T>(&self, fut: impl Future<Output = WebDriverResult<T>>) -> PomResult<T> {
        self.runtime.block_on(fut).map_err(to_pom)
    }

    fn mobile(&self, command: &str, args: Value) -> PomResult<Value> {
        let ret = self.run(self.driver.execute(format!("mobile: {command}"), vec![args]))?;
        Ok(ret.json().clone())
    }

    fn mobile_string(&self, command: &str) -> PomResult<String> {
        match self.mobile(command, json!({}))? {
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    fn element(&self, handle: &ElementHandle) -> PomResult<WebElement> {
        self.elements
            .borrow()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| PomError::driver(format!("unknown element {}", handle.id)))
    }

    fn app_arg(&self) -> PomResult<Value> {
        let id = self.app_id.as_deref().ok_or_else(|| {
            PomError::config("resetting the app needs app.package_name (Android) or app.bundle_id (iOS)")
        })?;
        Ok(match self.platform {
            Platform::Android => json!({ "appId": id }),
            Platform::Ios => json!({ "bundleId": id }),
        })
    }

    fn snapshot(&self, element: WebElement) -> PomResult<ElementHandle> {
        let handle = ElementHandle {
            id: element.element_id().to_string(),
            text: Some(self.run(element.text())?),
            displayed: self.run(element.is_displayed())?,
            enabled: self.run(element.is_enabled())?,
            rect: None,
        };
        let _ = self.elements.borrow_mut().insert(handle.id.clone(), element);
        Ok(handle)
    }
}

fn to_pom(e: thirtyfour::error::WebDriverError) -> PomError {
    PomError::driver(e.to_string())
}

impl MobileDriver for RemoteDriver {
    fn find_elements(&self, locator: &Locator) -> PomResult<Vec<ElementHandle>> {
        let xpath = locator.to_xpath(self.platform)?;
        let found = self.run(self.driver.find_all(By::XPath(xpath.as_str())))?;
        found.into_iter().map(|e| self.snapshot(e)).collect()
    }

    fn is_stale(&self, element: &ElementHandle) -> PomResult<bool> {
        let Some(web) = self.elements.borrow().get(&element.id).cloned() else {
            return Ok(true);
        };
        Ok(!self.run(web.is_present())?)
    }

    fn click(&self, element: &ElementHandle) -> PomResult<()> {
        let web = self.element(element)?;
        self.run(web.click())
    }

    fn clear(&self, element: &ElementHandle) -> PomResult<()> {
        let web = self.element(element)?;
        self.run(web.clear())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> PomResult<()> {
        let web = self.element(element)?;
        self.run(web.send_keys(text))
    }

    fn swipe(&self, swipe: &Swipe) -> PomResult<()> {
        let (start, end) = (swipe.start, swipe.end);
        let _ = match self.platform {
            Platform::Android => {
                let dx = f64::from(end.x - start.x);
                let dy = f64::from(end.y - start.y);
                let secs = (swipe.duration_ms.max(1) as f64) / 1000.0;
                self.mobile(
                    "dragGesture",
                    json!({
                        "startX": start.x,
                        "startY": start.y,
                        "endX": end.x,
                        "endY": end.y,
                        "speed": (dx.hypot(dy) / secs).round(),
                    }),
                )?
            }
            Platform::Ios => self.mobile(
                "dragFromToForDuration",
                json!({
                    "fromX": start.x,
                    "fromY": start.y,
                    "toX": end.x,
                    "toY": end.y,
                    "duration": (swipe.duration_ms as f64) / 1000.0,
                }),
            )?,
        };
        Ok(())
    }

    fn window_size(&self) -> PomResult<(u32, u32)> {
        let rect = serde_json::to_value(self.run(self.driver.get_window_rect())?)?;
        let dim = |key: &str| {
            rect.get(key)
                .and_then(Value::as_f64)
                .filter(|v| *v >= 0.0)
                .map(|v| v as u32)
                .ok_or_else(|| PomError::driver(format!("window rect has no {key}")))
        };
        Ok((dim("width")?, dim("height")?))
    }

    fn screenshot(&self) -> PomResult<Vec<u8>> {
        self.run(self.driver.screenshot_as_png())
    }

    fn hide_keyboard(&self) -> PomResult<()> {
        self.mobile("hideKeyboard", json!({})).map(drop)
    }

    fn current_activity(&self) -> PomResult<String> {
        self.mobile_string("getCurrentActivity")
    }

    fn current_package(&self) -> PomResult<String> {
        self.mobile_string("getCurrentPackage")
    }

    fn reset_app(&self) -> PomResult<()> {
        let app = self.app_arg()?;
        debug!(%app, "resetting app");
        for command in reset_commands(self.platform) {
            let _ = self.mobile(command, app.clone())?;
        }
        self.elements.borrow_mut().clear();
        Ok(())
    }

    fn background_app(&self, duration: Duration) -> PomResult<()> {
        self.mobile("backgroundApp", json!({ "seconds": duration.as_secs() }))
            .map(drop)
    }

    fn device_time(&self) -> PomResult<String> {
        self.mobile_string("getDeviceTime")
    }

    fn quit(&self) -> PomResult<()> {
        self.elements.borrow_mut().clear();
        self.run(self.driver.clone().quit())
    }
}

/// `mobile:` commands run by [`MobileDriver::reset_app`], in order.
///
/// Android clears the app's data between stop and start; XCUITest has no
/// equivalent, so iOS only restarts.
fn reset_commands(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Android => &["terminateApp", "clearApp", "activateApp"],
        Platform::Ios => &["terminateApp", "activateApp"],
    }
}

/// Opens [`RemoteDriver`] sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteSessionFactory;

impl SessionFactory for RemoteSessionFactory {
    type Driver = RemoteDriver;

    fn create(&self, config: &AppConfig) -> PomResult<RemoteDriver> {
        RemoteDriver::connect(config)
    }
}
