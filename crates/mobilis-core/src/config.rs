//! Device and server settings for mobilis.
//!
//! Settings are read from a YAML or JSON file (chosen by extension) holding the
//! automation server location and a map of named device profiles. Each profile
//! is turned into session capabilities by [`crate::capabilities`].
//!
//! # Lookup order
//!
//! [`MobilisConfig::locate`] resolves the file to read:
//!
//! 1. the `MOBILIS_CONFIG` environment variable,
//! 2. `./mobilis.yaml`,
//! 3. `~/.mobilis/config.yaml`.
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::config::MobilisConfig;
//!
//! let config = MobilisConfig::load_default().expect("config");
//! let pixel = config.device("pixel").expect("device profile");
//! println!("{} on {}", pixel.device_name, pixel.platform_type.name());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "MOBILIS_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mobilis.yaml";

const HOME_DIR: &str = ".mobilis";
const HOME_CONFIG_FILE: &str = "config.yaml";

/// Errors raised while reading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No config file could be found in any lookup location.
    #[error("no config file found (set MOBILIS_CONFIG or create mobilis.yaml)")]
    NotFound,

    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The requested device profile does not exist.
    #[error("device [{0}] not found in config")]
    DeviceNotFound(String),
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Mobile platform a device runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    #[serde(alias = "ANDROID", alias = "Android")]
    Android,
    #[serde(alias = "IOS", alias = "iOS")]
    Ios,
    #[serde(alias = "WINDOWS", alias = "Windows")]
    Windows,
}

impl PlatformType {
    /// The `platformName` capability value.
    pub fn name(self) -> &'static str {
        match self {
            PlatformType::Android => "Android",
            PlatformType::Ios => "iOS",
            PlatformType::Windows => "Windows",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the device is physical hardware or an emulator/simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    #[serde(alias = "REAL")]
    Real,
    #[serde(alias = "SIMULATOR", alias = "emulator")]
    Simulator,
}

/// Kind of application under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    #[default]
    #[serde(alias = "NATIVE")]
    Native,
    #[serde(alias = "HYBRID")]
    Hybrid,
    #[serde(alias = "WEB")]
    Web,
}

/// Mobile browser used for web sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[serde(alias = "CHROME")]
    Chrome,
    #[serde(alias = "CHROMIUM")]
    Chromium,
    #[serde(alias = "SAFARI")]
    Safari,
    #[serde(alias = "BROWSER")]
    Browser,
}

impl Browser {
    /// The `browserName` capability value.
    pub fn name(self) -> &'static str {
        match self {
            Browser::Chrome => "Chrome",
            Browser::Chromium => "Chromium",
            Browser::Safari => "Safari",
            Browser::Browser => "Browser",
        }
    }
}

/// Automation engine the server should drive the device with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationName {
    #[default]
    #[serde(alias = "APPIUM")]
    Appium,
    #[serde(alias = "ESPRESSO")]
    Espresso,
    #[serde(alias = "UIAUTOMATOR2")]
    UiAutomator2,
    #[serde(alias = "XCUITEST")]
    XcuiTest,
    #[serde(alias = "YOUIENGINE")]
    Youiengine,
}

impl AutomationName {
    /// The `automationName` capability value.
    pub fn name(self) -> &'static str {
        match self {
            AutomationName::Appium => "Appium",
            AutomationName::Espresso => "Espresso",
            AutomationName::UiAutomator2 => "UiAutomator2",
            AutomationName::XcuiTest => "XCUITest",
            AutomationName::Youiengine => "YouiEngine",
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Location of the remote automation server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSetting {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path prefix of the WebDriver endpoints (`/wd/hub` for Appium 1).
    #[serde(default)]
    pub base_path: String,
}

impl Default for ServerSetting {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_path: String::new(),
        }
    }
}

impl ServerSetting {
    /// The base URL every session command is sent under.
    pub fn service_url(&self) -> String {
        let path = self.base_path.trim_matches('/');
        if path.is_empty() {
            format!("http://{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}/{}", self.host, self.port, path)
        }
    }
}

/// A single named device profile.
///
/// Timeouts are in seconds unless the field says otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSetting {
    pub device_name: String,
    pub platform_type: PlatformType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_version: Option<String>,
    #[serde(default)]
    pub device_type: DeviceType,
    #[serde(default)]
    pub app_type: ApplicationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<Browser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_location: Option<String>,
    /// When set, `app_location` is used verbatim instead of under the resource dir.
    #[serde(default)]
    pub external_app: bool,
    #[serde(default)]
    pub no_reset: bool,
    #[serde(default)]
    pub full_reset: bool,
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,
    #[serde(default)]
    pub clear_system_files: bool,
    #[serde(default)]
    pub automation_name: AutomationName,
    /// Implicit wait applied to the driver after start.
    #[serde(default = "default_wait")]
    pub default_wait: u64,
    /// Upper bound for explicit element waits.
    #[serde(default = "default_wait_for_element")]
    pub wait_for_element_until: u64,

    // Android
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avd: Option<String>,
    #[serde(default = "default_avd_timeout")]
    pub avd_ready_timeout: u64,
    #[serde(default = "default_avd_timeout")]
    pub avd_launch_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_wait_activity: Option<String>,

    // iOS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udid: Option<String>,
    /// Milliseconds.
    #[serde(default = "default_wda_connection_timeout")]
    pub wda_connection_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_wda_bundle_id: Option<String>,
    #[serde(default)]
    pub use_new_wda: bool,
    #[serde(default)]
    pub use_prebuilt_wda: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4723
}

fn default_session_timeout() -> u64 {
    120
}

fn default_wait() -> u64 {
    5
}

fn default_wait_for_element() -> u64 {
    30
}

fn default_avd_timeout() -> u64 {
    120
}

fn default_wda_connection_timeout() -> u64 {
    240_000
}

fn default_resource_dir() -> PathBuf {
    PathBuf::from("tests/resources")
}

/// Top-level settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilisConfig {
    #[serde(default)]
    pub server: ServerSetting,
    /// Directory non-external `app_location` values are resolved against.
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceSetting>,
}

impl Default for MobilisConfig {
    fn default() -> Self {
        Self {
            server: ServerSetting::default(),
            resource_dir: default_resource_dir(),
            devices: BTreeMap::new(),
        }
    }
}

impl MobilisConfig {
    /// Parse settings from a file. `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed: Result<Self, String> = if is_json {
            serde_json::from_str(text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(text).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Load from the first location [`locate`](Self::locate) resolves.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::locate().ok_or(ConfigError::NotFound)?;
        Self::load(path)
    }

    /// Resolve the config file path, see the module docs for the lookup order.
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::home_dir()
            .map(|home| home.join(HOME_DIR).join(HOME_CONFIG_FILE))
            .filter(|p| p.exists())
    }

    /// Look up a device profile by name.
    pub fn device(&self, name: &str) -> Result<&DeviceSetting, ConfigError> {
        self.devices
            .get(name)
            .ok_or_else(|| ConfigError::DeviceNotFound(name.to_string()))
    }

    /// Names of all configured device profiles, sorted.
    pub fn device_names(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }
}
