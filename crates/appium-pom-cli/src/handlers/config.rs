//! Config command handler

use crate::commands::ConfigArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::Printer;
use appium_pom::{w3c_capabilities, AppConfig, ConfigLoader};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// What a test run would use from the merged config
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    /// Selected platform
    pub platform: String,
    /// Source that selected it
    pub platform_source: String,
    /// Device name
    pub device: String,
    /// Appium server URL
    pub server_url: String,
    /// Test-data environment named by the config
    pub environment: String,
    /// App version
    pub version: String,
    /// App build number
    pub build_number: String,
    /// Files merged, base first
    pub sources: Vec<String>,
    /// Capabilities as sent to the server
    pub capabilities: Map<String, Value>,
}

impl ConfigReport {
    /// Report for a loaded config
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            platform: config.platform().to_string(),
            platform_source: config.platform_source().to_string(),
            device: config.device().to_string(),
            server_url: config.server_url().to_string(),
            environment: config.environment_name().to_string(),
            version: config.version().to_string(),
            build_number: config.build_number().to_string(),
            sources: config
                .sources()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            capabilities: w3c_capabilities(&config.capabilities()),
        }
    }
}

/// Loader for the command's arguments, honouring `APPIUM_PLATFORM` and
/// `APPIUM_DEVICE`
#[must_use]
pub fn loader_for(args: &ConfigArgs) -> ConfigLoader {
    let mut loader = ConfigLoader::from_env(&args.config_dir);
    if let Some(platform) = &args.platform {
        loader = loader.with_platform(platform.clone());
    }
    if let Some(file) = &args.file {
        loader = loader.with_config_file(file.clone());
    }
    if let Some(device) = &args.device {
        loader = loader.with_device(device.clone());
    }
    loader
}

/// Execute the config command
pub fn execute_config(cli: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let config = loader_for(args).load()?;
    debug!(sources = config.sources().len(), "config loaded");
    let report = ConfigReport::from_config(&config);
    render(&Printer::new(args.format.into(), cli.use_color()), &report)
}

/// Print a config report
pub fn render(printer: &Printer, report: &ConfigReport) -> CliResult<()> {
    if printer.is_json() {
        return printer.json(report);
    }
    printer.field(
        "Platform",
        format!("{} ({})", report.platform, report.platform_source),
    )?;
    printer.field("Device", &report.device)?;
    printer.field("Server", &report.server_url)?;
    printer.field("Environment", &report.environment)?;
    printer.field(
        "App",
        format!("{} (build {})", report.version, report.build_number),
    )?;
    printer.field("Sources", report.sources.join(", "))?;
    printer.line("")?;
    printer.header("Capabilities")?;
    printer.record(&report.capabilities)
}
