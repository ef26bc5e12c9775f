//! Session capabilities built from a device profile.
//!
//! [`build`] maps a [`DeviceSetting`] to the capability set a remote session is
//! requested with:
//!
//! 1. **Common** keys every platform needs (device name, platform, reset flags,
//!    command timeout, automation engine).
//! 2. **Platform** keys: emulator and activity settings on Android, signing and
//!    WebDriverAgent settings on iOS. Other platforms are rejected.
//! 3. **Target**: the browser for web sessions, otherwise the app binary, which
//!    must exist on disk.
//!
//! Keys marked mandatory fail with [`DeviceError::CapabilitiesNotSet`] when the
//! profile leaves them empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, trace};

use crate::checker::check_capabilities_params;
use crate::config::{ApplicationType, DeviceSetting, DeviceType, PlatformType};
use crate::error::DeviceError;

/// Capability names.
pub mod keys {
    pub const APP: &str = "app";
    pub const AUTOMATION_NAME: &str = "automationName";
    pub const BROWSER_NAME: &str = "browserName";
    pub const DEVICE_NAME: &str = "deviceName";
    pub const FULL_RESET: &str = "fullReset";
    pub const NEW_COMMAND_TIMEOUT: &str = "newCommandTimeout";
    pub const NO_RESET: &str = "noReset";
    pub const PLATFORM_NAME: &str = "platformName";
    pub const PLATFORM_VERSION: &str = "platformVersion";
    pub const CLEAR_SYSTEM_FILES: &str = "clearSystemFiles";

    pub const AVD: &str = "avd";
    pub const AVD_READY_TIMEOUT: &str = "avdReadyTimeout";
    pub const AVD_LAUNCH_TIMEOUT: &str = "avdLaunchTimeout";
    pub const APP_ACTIVITY: &str = "appActivity";
    pub const APP_PACKAGE: &str = "appPackage";
    pub const APP_WAIT_ACTIVITY: &str = "appWaitActivity";

    pub const BUNDLE_ID: &str = "bundleId";
    pub const XCODE_ORG_ID: &str = "xcodeOrgId";
    pub const XCODE_SIGNING_ID: &str = "xcodeSigningId";
    pub const APP_NAME: &str = "appName";
    pub const UDID: &str = "udid";
    pub const WDA_CONNECTION_TIMEOUT: &str = "wdaConnectionTimeout";
    pub const BOOTSTRAP_PATH: &str = "bootstrapPath";
    pub const AGENT_PATH: &str = "agentPath";
    pub const UPDATED_WDA_BUNDLE_ID: &str = "updatedWDABundleId";
    pub const USE_NEW_WDA: &str = "useNewWDA";
    pub const USE_PREBUILT_WDA: &str = "usePrebuiltWDA";
}

/// Capabilities defined by the W3C WebDriver standard; everything else needs a vendor prefix.
const W3C_KEYS: &[&str] = &[
    "acceptInsecureCerts",
    "browserName",
    "browserVersion",
    "pageLoadStrategy",
    "platformName",
    "proxy",
    "setWindowRect",
    "strictFileInteractability",
    "timeouts",
    "unhandledPromptBehavior",
    "webSocketUrl",
];

const VENDOR_PREFIX: &str = "appium:";

/// An ordered set of capability key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(BTreeMap<String, Value>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`. An absent value is skipped, unless `mandatory`, in which
    /// case it fails the build.
    pub fn set<V: Into<Value>>(
        &mut self,
        key: &str,
        value: Option<V>,
        mandatory: bool,
    ) -> Result<(), DeviceError> {
        let value = value.map(Into::into);
        if mandatory {
            check_capabilities_params(key, value.as_ref())?;
        }
        if let Some(value) = value {
            self.0.insert(key.to_string(), value);
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// New-session payload in W3C form, with non-standard keys vendor-prefixed.
    pub fn to_w3c(&self) -> Value {
        let always_match: Map<String, Value> = self
            .0
            .iter()
            .map(|(key, value)| {
                let key = if W3C_KEYS.contains(&key.as_str()) || key.contains(':') {
                    key.clone()
                } else {
                    format!("{VENDOR_PREFIX}{key}")
                };
                (key, value.clone())
            })
            .collect();
        json!({
            "capabilities": {
                "alwaysMatch": always_match,
                "firstMatch": [{}],
            }
        })
    }
}

/// Build session capabilities for `setting`. Relative app locations resolve
/// against `resource_dir`.
pub fn build(setting: &DeviceSetting, resource_dir: &Path) -> Result<Capabilities, DeviceError> {
    trace!("Building Device capabilities...");
    let mut caps = Capabilities::new();

    set_common_capabilities(&mut caps, setting)?;
    set_device_specific_capabilities(&mut caps, setting)?;

    if setting.app_type == ApplicationType::Web {
        caps.set(
            keys::BROWSER_NAME,
            setting.browser.map(|b| b.name()),
            true,
        )?;
    } else {
        let path = app_path(setting, resource_dir)?;
        if !path.exists() {
            error!(path = %path.display(), "App not found on mentioned location");
            return Err(DeviceError::AppNotFound(path));
        }
        let path = path.canonicalize().unwrap_or(path);
        caps.set(keys::APP, Some(path.to_string_lossy().into_owned()), true)?;
    }

    trace!(count = caps.len(), "Building Device capabilities completed...");
    Ok(caps)
}

fn app_path(setting: &DeviceSetting, resource_dir: &Path) -> Result<PathBuf, DeviceError> {
    let location = setting
        .app_location
        .as_deref()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| DeviceError::CapabilitiesNotSet(keys::APP.to_string()))?;
    if setting.external_app {
        Ok(PathBuf::from(location))
    } else {
        Ok(resource_dir.join(location))
    }
}

fn set_common_capabilities(
    caps: &mut Capabilities,
    setting: &DeviceSetting,
) -> Result<(), DeviceError> {
    caps.set(keys::DEVICE_NAME, Some(setting.device_name.as_str()), true)?;
    caps.set(keys::PLATFORM_NAME, Some(setting.platform_type.name()), true)?;
    caps.set(keys::PLATFORM_VERSION, setting.device_version.as_deref(), false)?;
    caps.set(keys::NO_RESET, Some(setting.no_reset), false)?;
    caps.set(keys::FULL_RESET, Some(setting.full_reset), false)?;
    caps.set(keys::NEW_COMMAND_TIMEOUT, Some(setting.session_timeout), false)?;
    caps.set(keys::CLEAR_SYSTEM_FILES, Some(setting.clear_system_files), false)?;
    caps.set(
        keys::AUTOMATION_NAME,
        Some(setting.automation_name.name()),
        true,
    )?;
    Ok(())
}

fn set_device_specific_capabilities(
    caps: &mut Capabilities,
    setting: &DeviceSetting,
) -> Result<(), DeviceError> {
    match setting.platform_type {
        PlatformType::Ios => set_ios_capabilities(caps, setting),
        PlatformType::Android => set_android_capabilities(caps, setting),
        other => Err(DeviceError::DeviceTypeNotSupported(other)),
    }
}

fn set_android_capabilities(
    caps: &mut Capabilities,
    setting: &DeviceSetting,
) -> Result<(), DeviceError> {
    if setting.device_type == DeviceType::Simulator {
        caps.set(keys::AVD, setting.avd.as_deref(), true)?;
        caps.set(
            keys::AVD_READY_TIMEOUT,
            Some(secs_to_millis(setting.avd_ready_timeout)),
            false,
        )?;
        caps.set(
            keys::AVD_LAUNCH_TIMEOUT,
            Some(secs_to_millis(setting.avd_launch_timeout)),
            false,
        )?;
    }

    if setting.app_type != ApplicationType::Web {
        caps.set(keys::APP_ACTIVITY, setting.app_activity.as_deref(), true)?;
        caps.set(keys::APP_PACKAGE, setting.app_package.as_deref(), true)?;
        caps.set(
            keys::APP_WAIT_ACTIVITY,
            setting.app_wait_activity.as_deref(),
            false,
        )?;
    }
    Ok(())
}

fn set_ios_capabilities(caps: &mut Capabilities, setting: &DeviceSetting) -> Result<(), DeviceError> {
    if setting.app_type != ApplicationType::Web {
        caps.set(keys::BUNDLE_ID, setting.bundle_id.as_deref(), true)?;
    }
    caps.set(keys::XCODE_ORG_ID, setting.team_id.as_deref(), true)?;
    caps.set(keys::XCODE_SIGNING_ID, setting.signing_id.as_deref(), true)?;
    caps.set(keys::APP_NAME, setting.app_name.as_deref(), true)?;
    caps.set(keys::UDID, setting.udid.as_deref(), true)?;
    caps.set(
        keys::WDA_CONNECTION_TIMEOUT,
        Some(setting.wda_connection_timeout),
        true,
    )?;
    caps.set(keys::BOOTSTRAP_PATH, setting.bootstrap_path.as_deref(), false)?;
    caps.set(keys::AGENT_PATH, setting.agent_path.as_deref(), false)?;
    caps.set(
        keys::UPDATED_WDA_BUNDLE_ID,
        setting.updated_wda_bundle_id.as_deref(),
        false,
    )?;
    caps.set(keys::USE_NEW_WDA, Some(setting.use_new_wda), false)?;
    caps.set(keys::USE_PREBUILT_WDA, Some(setting.use_prebuilt_wda), false)?;
    Ok(())
}

fn secs_to_millis(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}
