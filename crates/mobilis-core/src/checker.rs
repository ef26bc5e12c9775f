//! Assertion helpers for capabilities and on-screen elements.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DeviceError;
use crate::webdriver::{RemoteElement, WebDriverError};

/// Element state queried by the checks below.
///
/// Implemented for [`RemoteElement`]; tests and alternative backends can
/// provide their own.
#[async_trait]
pub trait ElementState: Send + Sync {
    async fn is_displayed(&self) -> Result<bool, WebDriverError>;
    async fn is_enabled(&self) -> Result<bool, WebDriverError>;
}

#[async_trait]
impl ElementState for RemoteElement {
    async fn is_displayed(&self) -> Result<bool, WebDriverError> {
        RemoteElement::is_displayed(self).await
    }

    async fn is_enabled(&self) -> Result<bool, WebDriverError> {
        RemoteElement::is_enabled(self).await
    }
}

/// Fail when a capability value is missing or an empty string.
pub fn check_capabilities_params(key: &str, value: Option<&Value>) -> Result<(), DeviceError> {
    match value {
        None | Some(Value::Null) => Err(DeviceError::CapabilitiesNotSet(key.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(DeviceError::CapabilitiesNotSet(key.to_string()))
        }
        Some(_) => Ok(()),
    }
}

/// Fail with [`DeviceError::ElementNotDisplayed`] unless `element` is visible.
pub async fn check_device_element_displayed<E>(element: &E, name: &str) -> Result<(), DeviceError>
where
    E: ElementState + ?Sized,
{
    if !element.is_displayed().await? {
        return Err(DeviceError::ElementNotDisplayed(name.to_string()));
    }
    Ok(())
}

/// Fail with [`DeviceError::ElementDisabled`] unless `element` is enabled.
pub async fn check_device_element_enabled<E>(element: &E, name: &str) -> Result<(), DeviceError>
where
    E: ElementState + ?Sized,
{
    if !element.is_enabled().await? {
        return Err(DeviceError::ElementDisabled(name.to_string()));
    }
    Ok(())
}
