//! CLI for configuration-driven Appium sessions.
//!
//! Reads the same settings file page-object tests use and exposes the device
//! layer for ad-hoc use.
//!
//! # Usage
//!
//! ```bash
//! # List configured device profiles
//! mobilis devices
//!
//! # Print the capabilities a profile produces
//! mobilis caps pixel
//!
//! # Print the W3C new-session payload instead
//! mobilis caps pixel --w3c
//!
//! # Start a session, save a screenshot, stop
//! mobilis screenshot pixel home.png
//!
//! # Start a web session and open a URL
//! mobilis open chrome https://example.com
//!
//! # Check an element is displayed (and enabled)
//! mobilis check pixel id com.example:id/login --enabled
//!
//! # Use a specific settings file
//! mobilis -c ci/mobilis.yaml devices
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mobilis_core::actions::DeviceActions;
use mobilis_core::capabilities;
use mobilis_core::checker::{check_device_element_displayed, check_device_element_enabled};
use mobilis_core::config::{MobilisConfig, CONFIG_ENV};
use mobilis_core::device::Device;
use mobilis_core::driver::GenericDriver;
use mobilis_core::element::Locator;
use mobilis_core::error::DeviceError;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CLI for configuration-driven Appium sessions.
#[derive(Parser)]
#[command(name = "mobilis")]
#[command(about = "Start Appium sessions from device profiles and run quick checks")]
#[command(version)]
struct Cli {
    /// Settings file (YAML or JSON)
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Also write logs to mobilis.log in this directory (stderr logging stays on)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List configured device profiles
    Devices,

    /// Print the capabilities built for a device profile
    Caps {
        /// Device profile name
        device: String,
        /// Print the W3C new-session payload
        #[arg(long)]
        w3c: bool,
    },

    /// Start a session, capture a screenshot, stop
    Screenshot {
        /// Device profile name
        device: String,
        /// Output file (defaults to a timestamped name)
        path: Option<PathBuf>,
    },

    /// Start a session, navigate to a URL, stop
    Open {
        /// Device profile name
        device: String,
        /// URL to load
        url: String,
    },

    /// Start a session, check an element is displayed, stop
    Check {
        /// Device profile name
        device: String,
        /// Locator strategy (id, xpath, accessibility-id, class-name, ...)
        strategy: String,
        /// Locator value
        value: String,
        /// Also require the element to be enabled
        #[arg(long)]
        enabled: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref());

    let format = cli.format;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
            } else {
                eprintln!("Error: {}", e);
            }
            e.exit_code()
        }
    }
}

fn init_logging(log_dir: Option<&std::path::Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let file_layer = log_dir.map(|dir| {
        let file_appender = tracing_appender::rolling::never(dir, "mobilis.log");
        fmt::layer().with_writer(file_appender).with_ansi(false)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}

#[derive(Debug)]
enum CliError {
    /// Settings are missing, malformed, or describe an unusable device.
    Config(String),
    /// The session could not be started, driven, or stopped.
    Session(String),
    /// An element check did not hold.
    CheckFailed(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::CheckFailed(_) => ExitCode::from(1),
            CliError::Config(_) => ExitCode::from(2),
            CliError::Session(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::Session(msg) => write!(f, "{}", msg),
            CliError::CheckFailed(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<DeviceError> for CliError {
    fn from(e: DeviceError) -> Self {
        let msg = e.to_string();
        match e {
            DeviceError::Config(_)
            | DeviceError::CapabilitiesNotSet(_)
            | DeviceError::AppNotFound(_)
            | DeviceError::DeviceTypeNotSupported(_)
            | DeviceError::PlatformMismatch { .. } => CliError::Config(msg),
            DeviceError::ElementNotDisplayed(_)
            | DeviceError::ElementDisabled(_)
            | DeviceError::ElementNotFound { .. } => CliError::CheckFailed(msg),
            _ => CliError::Session(msg),
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<MobilisConfig, CliError> {
    let loaded = match path {
        Some(path) => MobilisConfig::load(path),
        None => MobilisConfig::load_default(),
    };
    loaded.map_err(|e| CliError::Config(e.to_string()))
}

/// What to do inside a one-shot session.
enum SessionOp {
    Screenshot(PathBuf),
    Open(String),
    Check { locator: Locator, enabled: bool },
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config)?;

    let op = match cli.command {
        Command::Devices => {
            if cli.format == OutputFormat::Json {
                let devices: Vec<_> = config
                    .devices
                    .iter()
                    .map(|(name, d)| {
                        serde_json::json!({
                            "name": name,
                            "device_name": d.device_name,
                            "platform": d.platform_type.name(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::json!({ "devices": devices }));
            } else {
                for (name, d) in &config.devices {
                    println!("{:<16} {:<8} {}", name, d.platform_type.name(), d.device_name);
                }
            }
            return Ok(());
        }
        Command::Caps { device, w3c } => {
            let setting = config
                .device(&device)
                .map_err(|e| CliError::Config(e.to_string()))?;
            let caps = capabilities::build(setting, &config.resource_dir)?;
            let output = if w3c {
                caps.to_w3c()
            } else {
                serde_json::to_value(&caps).map_err(|e| CliError::Config(e.to_string()))?
            };
            let pretty = serde_json::to_string_pretty(&output)
                .map_err(|e| CliError::Config(e.to_string()))?;
            println!("{}", pretty);
            return Ok(());
        }
        Command::Screenshot { device, path } => {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "screenshot-{}.png",
                    chrono::Local::now().format("%Y%m%d-%H%M%S")
                ))
            });
            (device, SessionOp::Screenshot(path))
        }
        Command::Open { device, url } => (device, SessionOp::Open(url)),
        Command::Check {
            device,
            strategy,
            value,
            enabled,
        } => {
            let locator = Locator::parse(&strategy, value).ok_or_else(|| {
                CliError::Config(format!("unknown locator strategy: {}", strategy))
            })?;
            (device, SessionOp::Check { locator, enabled })
        }
    };

    let (name, op) = op;
    let mut device: Device<GenericDriver> = Device::from_config(&config, &name)?;
    info!(device = %name, server = %device.server_url(), "starting session");
    device.start().await?;

    let result = match DeviceActions::new(&device) {
        Ok(actions) => perform(&actions, op).await,
        Err(e) => Err(e),
    };
    let stopped = device.stop().await;

    let message = result?;
    stopped?;

    if cli.format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "success": true, "message": message }));
    } else {
        println!("{}", message);
    }
    Ok(())
}

async fn perform(
    actions: &DeviceActions<'_, GenericDriver>,
    op: SessionOp,
) -> Result<String, DeviceError> {
    match op {
        SessionOp::Screenshot(path) => {
            actions.capture_screenshot(&path).await?;
            Ok(format!("Screenshot saved to {}", path.display()))
        }
        SessionOp::Open(url) => {
            actions.navigate_to(&url).await?;
            Ok(format!("Opened {}", url))
        }
        SessionOp::Check { locator, enabled } => {
            let name = locator.to_string();
            let element = actions.wait_for(&locator).await?;
            check_device_element_displayed(&element, &name).await?;
            if enabled {
                check_device_element_enabled(&element, &name).await?;
            }
            Ok(format!("Element [{}] passed", name))
        }
    }
}
