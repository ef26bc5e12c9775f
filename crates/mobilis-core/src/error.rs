//! Errors raised by the device layer.
//!
//! Every failure point in the session lifecycle and the helper APIs is
//! translated into a named [`DeviceError`] variant, with the underlying
//! [`WebDriverError`] kept as the source where there is one.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, PlatformType};
use crate::webdriver::WebDriverError;

#[derive(Error, Debug)]
pub enum DeviceError {
    /// The remote session is gone, usually because the automation server stopped.
    #[error("Appium server is not running or the session has ended: {0}")]
    ServerStopped(#[source] WebDriverError),

    #[error("Error occurred while closing app: {0}")]
    AppNotClosing(#[source] WebDriverError),

    #[error("App not found on mentioned location [{}]", .0.display())]
    AppNotFound(PathBuf),

    #[error("Error occurred while setting device driver default wait: {0}")]
    DriverDefaultWait(#[source] WebDriverError),

    #[error("Error occurred while initializing device driver: {0}")]
    DriverInitializationFailed(#[source] WebDriverError),

    #[error("Error occurred starting device driver: {0}")]
    DriverNotStarting(#[source] WebDriverError),

    #[error("Error occurred while stopping device driver: {0}")]
    DriverNotStopping(#[source] WebDriverError),

    #[error("[{0}] device driver is not started")]
    DriverNotStarted(PlatformType),

    #[error("[{0}] device type not supported")]
    DeviceTypeNotSupported(PlatformType),

    #[error("{driver} cannot drive a [{platform}] device")]
    PlatformMismatch {
        driver: &'static str,
        platform: PlatformType,
    },

    #[error("Device Desired Capabilities value for [{0}] key not set")]
    CapabilitiesNotSet(String),

    #[error("Device element [{0}] is not displayed")]
    ElementNotDisplayed(String),

    #[error("Device element [{0}] is disabled")]
    ElementDisabled(String),

    #[error("Device element [{name}] not found within {timeout:?}")]
    ElementNotFound { name: String, timeout: Duration },

    #[error("Device element [{name}] has no match at index {index} ({found} found)")]
    ElementIndexOutOfRange {
        name: String,
        index: usize,
        found: usize,
    },

    #[error("Device element [{0}] is not defined on this activity")]
    ElementNotDefined(String),

    /// A forwarded command failed for a reason other than a lost session.
    #[error("Device command failed: {0}")]
    Command(#[source] WebDriverError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DeviceError {
    /// Translate a forwarded command failure: a lost session becomes
    /// [`ServerStopped`](Self::ServerStopped), anything else is wrapped by `other`.
    pub fn from_command(err: WebDriverError, other: fn(WebDriverError) -> DeviceError) -> Self {
        if err.is_no_such_session() {
            DeviceError::ServerStopped(err)
        } else {
            other(err)
        }
    }
}

impl From<WebDriverError> for DeviceError {
    fn from(err: WebDriverError) -> Self {
        DeviceError::from_command(err, DeviceError::Command)
    }
}
