//! appium-pom: Page Object Model framework for Appium mobile tests
//!
//! Layered test-data loading, platform-aware configuration, explicit waits
//! and page objects over a synchronous driver seam.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     appium-pom Architecture                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Settings   │───►│ RunContext │───►│ Session<D> │            │
//! │   │ (env/dirs) │    │ config     │    │ (quit on   │            │
//! │   └────────────┘    │ data cache │    │  drop)     │            │
//! │                     │ resolver   │    └─────┬──────┘            │
//! │                     └────────────┘          │                   │
//! │   ┌────────────┐    ┌────────────┐    ┌─────▼──────┐            │
//! │   │ PageObject │───►│ Appium     │───►│MobileDriver│            │
//! │   │ BasePage   │    │ Wrapper    │    │ Mock/Remote│            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The remote driver (feature `appium`) talks to an Appium server through
//! `thirtyfour`; everything else runs against [`MockDriver`] as well.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod data;
#[allow(clippy::missing_errors_doc)]
pub mod driver;
mod error;
pub mod locator;
#[allow(clippy::missing_errors_doc)]
pub mod page;
#[cfg(feature = "appium")]
#[allow(clippy::missing_errors_doc, clippy::cast_precision_loss)]
pub mod remote;
pub mod resolve;
#[allow(clippy::missing_errors_doc)]
pub mod session;
#[allow(clippy::missing_errors_doc)]
pub mod wait;
#[allow(clippy::missing_errors_doc)]
pub mod wrapper;

pub use config::{AppConfig, ConfigLoader, Platform, PlatformSource, ResolvedPlatform};
pub use context::{RunContext, Settings};
pub use data::{merge_records, DataStore, Record, TestCase, TestData, TestDataLoader};
pub use driver::{Direction, ElementHandle, MockAction, MockDriver, MobileDriver, Swipe};
pub use error::{ErrorKind, PomError, PomResult};
pub use locator::{Locator, Point, Rect, Strategy};
pub use page::{BasePage, PageObject};
#[cfg(feature = "appium")]
pub use remote::{RemoteDriver, RemoteSessionFactory};
pub use resolve::{CaseBinding, CaseResolver, Resolution, ResolutionRule};
pub use session::{w3c_capabilities, Session, SessionFactory};
pub use wait::{FnCondition, WaitCondition, WaitOptions, WaitResult, WaitUtils};
pub use wrapper::AppiumWrapper;
