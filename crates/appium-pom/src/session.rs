//! Driver sessions scoped to one test.

use crate::config::AppConfig;
use crate::driver::MobileDriver;
use crate::error::PomResult;
use serde_json::{Map, Value};
use std::ops::Deref;
use tracing::{info, warn};

/// Capability names defined by W3C WebDriver; everything else needs the
/// `appium:` vendor prefix.
pub const STANDARD_CAPABILITIES: &[&str] = &[
    "platformName",
    "browserName",
    "browserVersion",
    "acceptInsecureCerts",
    "pageLoadStrategy",
    "proxy",
    "setWindowRect",
    "timeouts",
    "strictFileInteractability",
    "unhandledPromptBehavior",
    "webSocketUrl",
];

/// Prefix non-standard capability names with `appium:`.
///
/// Names that already carry a vendor prefix are left alone.
#[must_use]
pub fn w3c_capabilities(caps: &Map<String, Value>) -> Map<String, Value> {
    caps.iter()
        .map(|(key, value)| {
            let key = if STANDARD_CAPABILITIES.contains(&key.as_str()) || key.contains(':') {
                key.clone()
            } else {
                format!("appium:{key}")
            };
            (key, value.clone())
        })
        .collect()
}

/// Builds drivers from a merged config
pub trait SessionFactory {
    /// Driver type produced
    type Driver: MobileDriver;

    /// Open a new session
    fn create(&self, config: &AppConfig) -> PomResult<Self::Driver>;
}

impl<D, F> SessionFactory for F
where
    D: MobileDriver,
    F: Fn(&AppConfig) -> PomResult<D>,
{
    type Driver = D;

    fn create(&self, config: &AppConfig) -> PomResult<D> {
        self(config)
    }
}

/// A driver that is quit when the session goes out of scope.
#[derive(Debug)]
pub struct Session<D: MobileDriver> {
    driver: D,
    finished: bool,
}

impl<D: MobileDriver> Session<D> {
    /// Open a session and reset the app so the test starts clean.
    ///
    /// When the reset fails the session is quit before the error is returned.
    pub fn start<F>(factory: &F, config: &AppConfig) -> PomResult<Self>
    where
        F: SessionFactory<Driver = D>,
    {
        info!(
            platform = %config.platform(),
            device = config.device(),
            server = config.server_url(),
            "starting session"
        );
        let session = Self::from_driver(factory.create(config)?);
        session.driver.reset_app()?;
        Ok(session)
    }

    /// Wrap an already open driver
    #[must_use]
    pub const fn from_driver(driver: D) -> Self {
        Self {
            driver,
            finished: false,
        }
    }

    /// The driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Quit now and report the outcome
    pub fn finish(mut self) -> PomResult<()> {
        self.finished = true;
        info!("ending session");
        self.driver.quit()
    }
}

impl<D: MobileDriver> Deref for Session<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.driver
    }
}

impl<D: MobileDriver> Drop for Session<D> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.driver.quit() {
                warn!(error = %e, "failed to quit session");
            }
        }
    }
}
