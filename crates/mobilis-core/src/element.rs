//! Locators and page-object element definitions.
//!
//! A page object describes its screen as a tree of named [`DeviceElement`]s.
//! Each node carries the [`Locator`] used to find it inside its parent and an
//! optional index when the locator matches several siblings.
//!
//! ```
//! use mobilis_core::element::{DeviceElement, Locator};
//!
//! let root = DeviceElement::create("Container")
//!     .using(Locator::id("com.example:id/pageContainer"))
//!     .child(
//!         DeviceElement::create("Skip")
//!             .using(Locator::class_name("android.widget.TextView"))
//!             .index(2),
//!     );
//!
//! let path = root.path_to("Skip").unwrap();
//! assert_eq!(path.len(), 2);
//! ```

use std::fmt;

/// Element location strategy and its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    ClassName(String),
    Xpath(String),
    AccessibilityId(String),
    Name(String),
    CssSelector(String),
    AndroidUiAutomator(String),
    IosPredicate(String),
    IosClassChain(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::Xpath(value.into())
    }

    pub fn accessibility_id(value: impl Into<String>) -> Self {
        Locator::AccessibilityId(value.into())
    }

    /// Parse a strategy name as used on the command line (`id`, `xpath`, `accessibility-id`, ...).
    pub fn parse(strategy: &str, value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let locator = match strategy.to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "id" => Locator::Id(value),
            "class" | "class-name" => Locator::ClassName(value),
            "xpath" => Locator::Xpath(value),
            "accessibility-id" | "a11y" => Locator::AccessibilityId(value),
            "name" => Locator::Name(value),
            "css" | "css-selector" => Locator::CssSelector(value),
            "uiautomator" | "android-uiautomator" => Locator::AndroidUiAutomator(value),
            "predicate" | "ios-predicate" => Locator::IosPredicate(value),
            "class-chain" | "ios-class-chain" => Locator::IosClassChain(value),
            _ => return None,
        };
        Some(locator)
    }

    /// The `using` value sent to the server.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::ClassName(_) => "class name",
            Locator::Xpath(_) => "xpath",
            Locator::AccessibilityId(_) => "accessibility id",
            Locator::Name(_) => "name",
            Locator::CssSelector(_) => "css selector",
            Locator::AndroidUiAutomator(_) => "-android uiautomator",
            Locator::IosPredicate(_) => "-ios predicate string",
            Locator::IosClassChain(_) => "-ios class chain",
        }
    }

    /// The strategy argument.
    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::ClassName(v)
            | Locator::Xpath(v)
            | Locator::AccessibilityId(v)
            | Locator::Name(v)
            | Locator::CssSelector(v)
            | Locator::AndroidUiAutomator(v)
            | Locator::IosPredicate(v)
            | Locator::IosClassChain(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// A named node in a page object's element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceElement {
    name: String,
    locator: Option<Locator>,
    index: Option<usize>,
    children: Vec<DeviceElement>,
}

impl DeviceElement {
    /// Start a definition for an element called `name`.
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locator: None,
            index: None,
            children: Vec::new(),
        }
    }

    /// Locator used to find this element inside its parent.
    pub fn using(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Pick the n-th (zero based) match instead of the first one.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Nest `child` under this element.
    pub fn child(mut self, child: DeviceElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    pub fn position(&self) -> Option<usize> {
        self.index
    }

    pub fn children(&self) -> &[DeviceElement] {
        &self.children
    }

    /// Depth-first search for the element called `name`.
    pub fn find(&self, name: &str) -> Option<&DeviceElement> {
        self.path_to(name).and_then(|path| path.last().copied())
    }

    /// Chain of elements from this node down to the one called `name`, inclusive.
    pub fn path_to(&self, name: &str) -> Option<Vec<&DeviceElement>> {
        if self.name == name {
            return Some(vec![self]);
        }
        self.children.iter().find_map(|child| {
            child.path_to(name).map(|mut path| {
                path.insert(0, self);
                path
            })
        })
    }
}
