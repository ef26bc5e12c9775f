//! Remote driver trait for platform-typed sessions.
//!
//! This module defines the [`RemoteDriver`] trait, the seam between the device
//! layer and the remote automation session. A driver type knows how to open a
//! session from a server URL and a capability set, and exposes the commands
//! the helpers forward. [`Device`](crate::device::Device) is generic over it,
//! so page objects can be written against [`AndroidDriver`], [`IosDriver`], or
//! the platform-neutral [`GenericDriver`].
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::capabilities::Capabilities;
//! use mobilis_core::driver::{AndroidDriver, RemoteDriver};
//!
//! # async fn example(caps: Capabilities) -> Result<(), Box<dyn std::error::Error>> {
//! let driver = AndroidDriver::start("http://127.0.0.1:4723", &caps).await?;
//! println!("activity: {}", driver.current_activity().await?);
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;

use crate::capabilities::Capabilities;
use crate::config::PlatformType;
use crate::element::Locator;
use crate::webdriver::{RemoteElement, Session, WebDriverClient, WebDriverError};

/// A driver bound to one remote session.
///
/// Implementors supply [`from_session`](RemoteDriver::from_session) and
/// [`session`](RemoteDriver::session); construction and every command are
/// provided on top of those.
#[async_trait]
pub trait RemoteDriver: Sized + Send + Sync {
    /// Human-readable driver name used in logs and errors.
    const NAME: &'static str;

    /// Platform this driver is restricted to, or `None` for any platform.
    fn platform() -> Option<PlatformType> {
        None
    }

    /// Wrap an already-open session.
    fn from_session(session: Session) -> Self;

    /// The underlying session.
    fn session(&self) -> &Session;

    /// Open a session on the server at `server_url` and wrap it.
    async fn start(server_url: &str, capabilities: &Capabilities) -> Result<Self, WebDriverError> {
        let client = WebDriverClient::new(server_url)?;
        let session = client.new_session(&capabilities.to_w3c()).await?;
        Ok(Self::from_session(session))
    }

    async fn close_app(&self) -> Result<(), WebDriverError> {
        self.session().close_app().await
    }

    async fn quit(&self) -> Result<(), WebDriverError> {
        self.session().quit().await
    }

    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), WebDriverError> {
        self.session().set_implicit_wait(wait).await
    }

    /// PNG bytes of the current screen.
    async fn screenshot(&self) -> Result<Vec<u8>, WebDriverError> {
        self.session().screenshot().await
    }

    async fn hide_keyboard(&self) -> Result<(), WebDriverError> {
        self.session().hide_keyboard().await
    }

    async fn get(&self, url: &str) -> Result<(), WebDriverError> {
        self.session().navigate(url).await
    }

    async fn page_source(&self) -> Result<String, WebDriverError> {
        self.session().page_source().await
    }

    async fn find_element(&self, locator: &Locator) -> Result<RemoteElement, WebDriverError> {
        self.session().find_element(locator).await
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<RemoteElement>, WebDriverError> {
        self.session().find_elements(locator).await
    }
}

/// Driver for Android sessions.
#[derive(Debug, Clone)]
pub struct AndroidDriver {
    session: Session,
}

impl AndroidDriver {
    pub async fn current_activity(&self) -> Result<String, WebDriverError> {
        self.session.current_activity().await
    }

    pub async fn current_package(&self) -> Result<String, WebDriverError> {
        self.session.current_package().await
    }
}

impl RemoteDriver for AndroidDriver {
    const NAME: &'static str = "AndroidDriver";

    fn platform() -> Option<PlatformType> {
        Some(PlatformType::Android)
    }

    fn from_session(session: Session) -> Self {
        Self { session }
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

/// Driver for iOS sessions.
#[derive(Debug, Clone)]
pub struct IosDriver {
    session: Session,
}

impl RemoteDriver for IosDriver {
    const NAME: &'static str = "IOSDriver";

    fn platform() -> Option<PlatformType> {
        Some(PlatformType::Ios)
    }

    fn from_session(session: Session) -> Self {
        Self { session }
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

/// Platform-neutral driver.
#[derive(Debug, Clone)]
pub struct GenericDriver {
    session: Session,
}

impl RemoteDriver for GenericDriver {
    const NAME: &'static str = "AppiumDriver";

    fn from_session(session: Session) -> Self {
        Self { session }
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_restrictions() {
        assert_eq!(AndroidDriver::platform(), Some(PlatformType::Android));
        assert_eq!(IosDriver::platform(), Some(PlatformType::Ios));
        assert_eq!(GenericDriver::platform(), None);
    }
}
