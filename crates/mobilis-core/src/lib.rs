//! # mobilis-core
//!
//! Configuration-driven session and page-object helpers for mobile UI
//! automation against an Appium (W3C WebDriver) server.
//!
//! This crate reads device profiles from a settings file, turns them into
//! session capabilities, starts and stops remote sessions, and offers a small
//! set of helpers for page-object style tests.
//!
//! ## Modules
//!
//! - [`config`] - Server and device settings loaded from YAML or JSON
//! - [`capabilities`] - Mapping of a device profile to session capabilities
//! - [`webdriver`] - HTTP transport for the remote automation server
//! - [`driver`] - The [`RemoteDriver`](driver::RemoteDriver) trait and platform drivers
//! - [`device`] - Session lifecycle with per-step error translation
//! - [`actions`] - Screenshots, keyboard, navigation and element waits
//! - [`checker`] - Capability and element state assertions
//! - [`element`] - Locators and page-object element trees
//! - [`activity`] - Page objects resolved against a running device
//! - [`error`] - The [`DeviceError`](error::DeviceError) type
//!
//! ## External Dependencies
//!
//! A running Appium server (or any W3C WebDriver server with the Appium
//! extensions) reachable at the configured host and port.
//!
//! ## Example
//!
//! ```no_run
//! use mobilis_core::actions::DeviceActions;
//! use mobilis_core::device::Device;
//! use mobilis_core::driver::AndroidDriver;
//!
//! # async fn example() -> Result<(), mobilis_core::error::DeviceError> {
//! let mut device: Device<AndroidDriver> = Device::load("pixel")?;
//! device.start().await?;
//!
//! let actions = DeviceActions::new(&device)?;
//! actions.hide_keyboard().await?;
//! actions.capture_screenshot("target/screens/home.png").await?;
//!
//! device.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod activity;
pub mod capabilities;
pub mod checker;
pub mod config;
pub mod device;
pub mod driver;
pub mod element;
pub mod error;
pub mod webdriver;
