//! Device-level actions for page objects.
//!
//! [`DeviceActions`] borrows a started [`Device`] and forwards screen-wide
//! actions to its driver: screenshots, keyboard dismissal, URL navigation and
//! explicit element waits.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::device::Device;
use crate::driver::RemoteDriver;
use crate::element::Locator;
use crate::error::DeviceError;
use crate::webdriver::RemoteElement;

/// Delay between element lookups while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Screen-wide actions on a running device.
pub struct DeviceActions<'a, D: RemoteDriver> {
    device: &'a Device<D>,
    driver: &'a D,
    wait: Duration,
}

impl<'a, D: RemoteDriver> DeviceActions<'a, D> {
    /// Borrow a started device. Fails with [`DeviceError::DriverNotStarted`] otherwise.
    pub fn new(device: &'a Device<D>) -> Result<Self, DeviceError> {
        let driver = device
            .driver()
            .ok_or(DeviceError::DriverNotStarted(device.setting().platform_type))?;
        Ok(Self {
            device,
            driver,
            wait: Duration::from_secs(device.setting().wait_for_element_until),
        })
    }

    pub fn device(&self) -> &'a Device<D> {
        self.device
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    /// Upper bound used by [`wait_for`](Self::wait_for).
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Save a PNG of the current screen at `path`.
    ///
    /// A lost session is an error; failing to write the file is logged and
    /// otherwise ignored so a diagnostic screenshot never fails a test.
    pub async fn capture_screenshot(&self, path: impl AsRef<Path>) -> Result<(), DeviceError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Capturing screenshot...");
        let png = self.driver.screenshot().await?;
        if let Err(err) = write_file(path, &png).await {
            error!(path = %path.display(), error = %err, "Error occurred while capturing screenshot");
        }
        Ok(())
    }

    pub async fn hide_keyboard(&self) -> Result<(), DeviceError> {
        info!("Hiding the keyboard...");
        self.driver.hide_keyboard().await?;
        Ok(())
    }

    pub async fn navigate_to(&self, url: &str) -> Result<(), DeviceError> {
        info!(url, "Navigating to URL...");
        self.driver.get(url).await?;
        Ok(())
    }

    /// Poll for an element until it appears or the wait elapses.
    ///
    /// A wait too large to represent as a deadline polls without one.
    pub async fn wait_for(&self, locator: &Locator) -> Result<RemoteElement, DeviceError> {
        let deadline = Instant::now().checked_add(self.wait);
        loop {
            match self.driver.find_element(locator).await {
                Ok(element) => return Ok(element),
                Err(err) if err.is_no_such_element() => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Err(DeviceError::ElementNotFound {
                            name: locator.to_string(),
                            timeout: self.wait,
                        });
                    }
                    debug!(%locator, "element not present yet");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
