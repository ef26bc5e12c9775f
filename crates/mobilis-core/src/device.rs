//! Device session lifecycle.
//!
//! [`Device`] ties a device profile to a remote driver type. Capabilities are
//! built when the device is created, so configuration problems (missing keys,
//! missing app binary, unsupported platform) surface before any network call.
//! [`start`](Device::start) opens the session and applies the default implicit
//! wait; [`stop`](Device::stop) closes the app and ends the session.
//!
//! Each failure point maps to its own [`DeviceError`] variant; a lost session
//! always maps to [`DeviceError::ServerStopped`].
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::device::Device;
//! use mobilis_core::driver::AndroidDriver;
//!
//! # async fn example() -> Result<(), mobilis_core::error::DeviceError> {
//! let mut device: Device<AndroidDriver> = Device::load("pixel")?;
//! device.start().await?;
//! // ... drive the app ...
//! device.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::capabilities::{self, Capabilities};
use crate::config::{ApplicationType, DeviceSetting, MobilisConfig};
use crate::driver::RemoteDriver;
use crate::error::DeviceError;
use crate::webdriver::WebDriverError;

/// A configured device and, once started, its driver.
pub struct Device<D: RemoteDriver> {
    capabilities: Capabilities,
    driver: Option<D>,
    server_url: String,
    setting: DeviceSetting,
}

impl<D: RemoteDriver> Device<D> {
    /// Create a device for `setting`, talking to the server at `server_url`.
    ///
    /// Relative app locations resolve against `resource_dir`.
    pub fn new(
        server_url: impl Into<String>,
        setting: DeviceSetting,
        resource_dir: &Path,
    ) -> Result<Self, DeviceError> {
        if let Some(platform) = D::platform() {
            if platform != setting.platform_type {
                return Err(DeviceError::PlatformMismatch {
                    driver: D::NAME,
                    platform: setting.platform_type,
                });
            }
        }

        let capabilities = capabilities::build(&setting, resource_dir)?;
        Ok(Self {
            capabilities,
            driver: None,
            server_url: server_url.into(),
            setting,
        })
    }

    /// Create the device called `name` from `config`.
    pub fn from_config(config: &MobilisConfig, name: &str) -> Result<Self, DeviceError> {
        let setting = config.device(name)?.clone();
        debug!(device = name, server = %config.server.service_url(), "creating device");
        Self::new(config.server.service_url(), setting, &config.resource_dir)
    }

    /// Create the device called `name` from the default config file.
    pub fn load(name: &str) -> Result<Self, DeviceError> {
        let config = MobilisConfig::load_default()?;
        Self::from_config(&config, name)
    }

    /// The running driver, if the device has been started.
    pub fn driver(&self) -> Option<&D> {
        trace!(platform = %self.setting.platform_type, "Getting device driver...");
        self.driver.as_ref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn setting(&self) -> &DeviceSetting {
        &self.setting
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }

    /// Open the remote session and apply the default implicit wait.
    ///
    /// Starting an already running device is a no-op.
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        let platform = self.setting.platform_type;
        if self.driver.is_some() {
            debug!(%platform, "device driver already running");
            return Ok(());
        }

        trace!(%platform, driver = D::NAME, "Starting device driver...");
        let driver = D::start(&self.server_url, &self.capabilities)
            .await
            .map_err(start_error)?;

        let wait = Duration::from_secs(self.setting.default_wait);
        if let Err(err) = driver.set_implicit_wait(wait).await {
            // Leave no session behind on the server.
            if let Err(quit_err) = driver.quit().await {
                warn!(error = %quit_err, "failed to quit driver after default wait error");
            }
            return Err(DeviceError::from_command(err, DeviceError::DriverDefaultWait));
        }

        self.driver = Some(driver);
        Ok(())
    }

    /// Close the app and end the remote session.
    ///
    /// The driver is forgotten even when a step fails; if closing the app
    /// fails, quitting is still attempted before the close error is returned.
    pub async fn stop(&mut self) -> Result<(), DeviceError> {
        let platform = self.setting.platform_type;
        let Some(driver) = self.driver.take() else {
            trace!(%platform, "device driver already stopped...");
            return Ok(());
        };

        let closed = if self.setting.app_type == ApplicationType::Web {
            Ok(())
        } else {
            trace!(%platform, "Closing app on device...");
            driver
                .close_app()
                .await
                .map_err(|e| DeviceError::from_command(e, DeviceError::AppNotClosing))
        };

        trace!(%platform, "Quitting device driver...");
        let quit = driver
            .quit()
            .await
            .map_err(|e| DeviceError::from_command(e, DeviceError::DriverNotStopping));

        closed?;
        quit
    }
}

/// A malformed session response means the driver could not be built;
/// anything else means the server refused or could not be reached.
fn start_error(err: WebDriverError) -> DeviceError {
    match err {
        WebDriverError::InvalidResponse(_) => DeviceError::DriverInitializationFailed(err),
        other => DeviceError::DriverNotStarting(other),
    }
}

impl<D: RemoteDriver> Drop for Device<D> {
    fn drop(&mut self) {
        if self.driver.is_some() {
            warn!(
                platform = %self.setting.platform_type,
                "device dropped while its driver is still running; call stop() to end the session"
            );
        }
    }
}
