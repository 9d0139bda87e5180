//! Element locators and geometry.

use crate::config::Platform;
use crate::error::{PomError, PomResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Element rectangle in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Whether the rectangle has no area
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Appium locator strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Resource id (Android) or name (iOS)
    Id,
    /// XPath over the view hierarchy
    XPath,
    /// content-desc (Android) or accessibilityIdentifier (iOS)
    AccessibilityId,
    /// Native class name
    ClassName,
    /// Element name
    Name,
    /// `UiSelector` expression
    AndroidUiAutomator,
    /// `NSPredicate` expression
    IosPredicate,
    /// XCUITest class chain
    IosClassChain,
}

impl Strategy {
    /// Wire name of the strategy
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::XPath => "xpath",
            Self::AccessibilityId => "accessibility id",
            Self::ClassName => "class name",
            Self::Name => "name",
            Self::AndroidUiAutomator => "-android uiautomator",
            Self::IosPredicate => "-ios predicate string",
            Self::IosClassChain => "-ios class chain",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy plus value, e.g. `(Id, "com.example:id/login")`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Strategy
    pub strategy: Strategy,
    /// Selector value
    pub value: String,
}

impl Locator {
    /// Create a locator
    #[must_use]
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    /// By resource id
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// By XPath
    #[must_use]
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// By accessibility id
    #[must_use]
    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Self::new(Strategy::AccessibilityId, value)
    }

    /// By class name
    #[must_use]
    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, value)
    }

    /// By name
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new(Strategy::Name, value)
    }

    /// By `UiSelector` expression
    #[must_use]
    pub fn android_uiautomator(value: impl Into<String>) -> Self {
        Self::new(Strategy::AndroidUiAutomator, value)
    }

    /// By iOS predicate string
    #[must_use]
    pub fn ios_predicate(value: impl Into<String>) -> Self {
        Self::new(Strategy::IosPredicate, value)
    }

    /// By iOS class chain
    #[must_use]
    pub fn ios_class_chain(value: impl Into<String>) -> Self {
        Self::new(Strategy::IosClassChain, value)
    }

    /// Equivalent XPath for clients limited to W3C strategies.
    ///
    /// Platform-native query languages (`UiSelector`, predicates, class
    /// chains) have no XPath form and are rejected. A bare Android id
    /// (`username`) also matches `<package>:id/username`.
    pub fn to_xpath(&self, platform: Platform) -> PomResult<String> {
        let v = xpath_literal(&self.value);
        match (self.strategy, platform) {
            (Strategy::XPath, _) => Ok(self.value.clone()),
            (Strategy::Id, Platform::Android) if !self.value.contains(":id/") => Ok(format!(
                "//*[@resource-id={v} or substring-after(@resource-id, ':id/')={v}]"
            )),
            (Strategy::Id, Platform::Android) => Ok(format!("//*[@resource-id={v}]")),
            (Strategy::AccessibilityId, Platform::Android) => Ok(format!("//*[@content-desc={v}]")),
            (Strategy::Id | Strategy::AccessibilityId | Strategy::Name, Platform::Ios)
            | (Strategy::Name, Platform::Android) => Ok(format!("//*[@name={v}]")),
            (Strategy::ClassName, _) => Ok(format!("//{}", self.value)),
            (Strategy::AndroidUiAutomator | Strategy::IosPredicate | Strategy::IosClassChain, _) => {
                Err(PomError::driver(format!(
                    "locator strategy `{}` has no XPath equivalent",
                    self.strategy
                )))
            }
        }
    }
}

/// Quote a string as an XPath literal, using `concat()` when it holds both
/// quote kinds.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.strategy, self.value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(10, 20, 100, 50);
        assert_eq!(rect.center(), Point::new(60, 45));
        assert!(!rect.is_empty());
        assert!(Rect::new(0, 0, 0, 10).is_empty());
    }

    #[test]
    fn test_strategy_wire_names() {
        assert_eq!(Strategy::AccessibilityId.as_str(), "accessibility id");
        assert_eq!(Strategy::AndroidUiAutomator.as_str(), "-android uiautomator");
        assert_eq!(Strategy::IosPredicate.to_string(), "-ios predicate string");
    }

    #[test]
    fn test_bare_android_id_matches_any_package() {
        let xpath = Locator::id("username").to_xpath(Platform::Android).unwrap();
        assert_eq!(
            xpath,
            "//*[@resource-id='username' or substring-after(@resource-id, ':id/')='username']"
        );
        assert_eq!(
            Locator::id("username").to_xpath(Platform::Ios).unwrap(),
            "//*[@name='username']"
        );
    }

    #[test]
    fn test_xpath_translation() {
        assert_eq!(
            Locator::id("com.example:id/login").to_xpath(Platform::Android).unwrap(),
            "//*[@resource-id='com.example:id/login']"
        );
        assert_eq!(
            Locator::accessibility_id("Login").to_xpath(Platform::Android).unwrap(),
            "//*[@content-desc='Login']"
        );
        assert_eq!(
            Locator::accessibility_id("Login").to_xpath(Platform::Ios).unwrap(),
            "//*[@name='Login']"
        );
        assert_eq!(
            Locator::class_name("android.widget.Button").to_xpath(Platform::Android).unwrap(),
            "//android.widget.Button"
        );
        assert!(Locator::android_uiautomator("new UiSelector()").to_xpath(Platform::Android).is_err());
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn test_locator_display() {
        let locator = Locator::id("com.example:id/login");
        assert_eq!(locator.to_string(), "id=\"com.example:id/login\"");
        assert_eq!(Locator::xpath("//a").strategy, Strategy::XPath);
    }
}
