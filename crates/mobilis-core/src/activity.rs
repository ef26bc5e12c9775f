//! Page objects ("activities") over a running device.
//!
//! A screen is described by an [`ActivityModel`], which returns the root of
//! its [`DeviceElement`] tree. [`Activity`] resolves named elements from that
//! tree against the live session: the root is waited for, every further node
//! is looked up inside the element resolved for its parent, and nodes with an
//! index pick the n-th match.
//!
//! ```no_run
//! use mobilis_core::activity::{Activity, ActivityModel};
//! use mobilis_core::device::Device;
//! use mobilis_core::driver::AndroidDriver;
//! use mobilis_core::element::{DeviceElement, Locator};
//!
//! struct LoginScreen;
//!
//! impl ActivityModel for LoginScreen {
//!     fn prepare(&self) -> DeviceElement {
//!         DeviceElement::create("Form")
//!             .using(Locator::id("com.example:id/form"))
//!             .child(DeviceElement::create("User").using(Locator::id("com.example:id/user")))
//!             .child(DeviceElement::create("Login").using(Locator::id("com.example:id/login")))
//!     }
//! }
//!
//! # async fn example(device: &Device<AndroidDriver>) -> Result<(), mobilis_core::error::DeviceError> {
//! let login = Activity::new(device, &LoginScreen)?;
//! login.enter_text("User", "alice").await?;
//! login.verify_enabled("Login").await?;
//! login.tap("Login").await?;
//! # Ok(())
//! # }
//! ```

use tracing::{info, trace};

use crate::actions::DeviceActions;
use crate::checker::{check_device_element_displayed, check_device_element_enabled};
use crate::device::Device;
use crate::driver::RemoteDriver;
use crate::element::DeviceElement;
use crate::error::DeviceError;
use crate::webdriver::RemoteElement;

/// Describes the element tree of one screen.
pub trait ActivityModel {
    fn prepare(&self) -> DeviceElement;
}

/// A screen bound to a running device.
pub struct Activity<'a, D: RemoteDriver> {
    actions: DeviceActions<'a, D>,
    root: DeviceElement,
}

impl<'a, D: RemoteDriver> Activity<'a, D> {
    pub fn new(device: &'a Device<D>, model: &impl ActivityModel) -> Result<Self, DeviceError> {
        Ok(Self {
            actions: DeviceActions::new(device)?,
            root: model.prepare(),
        })
    }

    /// Screen-wide actions for the same device.
    pub fn actions(&self) -> &DeviceActions<'a, D> {
        &self.actions
    }

    pub fn root(&self) -> &DeviceElement {
        &self.root
    }

    /// Resolve the element called `name` on the live screen.
    pub async fn on_element(&self, name: &str) -> Result<RemoteElement, DeviceError> {
        let path = self
            .root
            .path_to(name)
            .ok_or_else(|| DeviceError::ElementNotDefined(name.to_string()))?;

        let mut current: Option<RemoteElement> = None;
        for definition in path {
            trace!(element = definition.name(), "locating element");
            let locator = definition
                .locator()
                .ok_or_else(|| DeviceError::ElementNotDefined(definition.name().to_string()))?;

            let found = match (&current, definition.position()) {
                (None, None) => self.actions.wait_for(locator).await?,
                (None, Some(index)) => {
                    self.actions.wait_for(locator).await?;
                    let all = self.actions.driver().find_elements(locator).await?;
                    pick(all, index, definition.name())?
                }
                (Some(parent), None) => parent.find_element(locator).await?,
                (Some(parent), Some(index)) => {
                    let all = parent.find_elements(locator).await?;
                    pick(all, index, definition.name())?
                }
            };
            current = Some(found);
        }

        current.ok_or_else(|| DeviceError::ElementNotDefined(name.to_string()))
    }

    pub async fn verify_displayed(&self, name: &str) -> Result<(), DeviceError> {
        let element = self.on_element(name).await?;
        check_device_element_displayed(&element, name).await
    }

    pub async fn verify_enabled(&self, name: &str) -> Result<(), DeviceError> {
        let element = self.on_element(name).await?;
        check_device_element_enabled(&element, name).await
    }

    /// Tap the element after checking it is displayed and enabled.
    pub async fn tap(&self, name: &str) -> Result<(), DeviceError> {
        let element = self.on_element(name).await?;
        check_device_element_displayed(&element, name).await?;
        check_device_element_enabled(&element, name).await?;
        info!(element = name, "Tapping on element...");
        element.click().await?;
        Ok(())
    }

    /// Clear the element and type `text` into it.
    pub async fn enter_text(&self, name: &str, text: &str) -> Result<(), DeviceError> {
        let element = self.on_element(name).await?;
        check_device_element_displayed(&element, name).await?;
        info!(element = name, "Entering text in element...");
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    pub async fn text_of(&self, name: &str) -> Result<String, DeviceError> {
        let element = self.on_element(name).await?;
        Ok(element.text().await?)
    }
}

fn pick(mut all: Vec<RemoteElement>, index: usize, name: &str) -> Result<RemoteElement, DeviceError> {
    if index < all.len() {
        Ok(all.swap_remove(index))
    } else {
        Err(DeviceError::ElementIndexOutOfRange {
            name: name.to_string(),
            index,
            found: all.len(),
        })
    }
}
