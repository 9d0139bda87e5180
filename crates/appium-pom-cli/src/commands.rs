//! CLI command definitions using clap

use crate::output::OutputFormat;
use appium_pom::data::{DEFAULT_DATA_DIR, TEST_ENV};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// apom: inspect what an appium-pom test run would see
#[derive(Parser, Debug)]
#[command(name = "apom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the merged config, resolved platform and session capabilities
    Config(ConfigArgs),

    /// Inspect test-data files and test name resolution
    Data(DataArgs),
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Directory holding app_config*.json
    #[arg(long, default_value = "config", env = "APPIUM_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Explicit platform config file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Platform (android, ios); overrides APPIUM_PLATFORM
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Device name; overrides APPIUM_DEVICE
    #[arg(long)]
    pub device: Option<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the data command
#[derive(Args, Debug)]
pub struct DataArgs {
    /// Data subcommand
    #[command(subcommand)]
    pub command: DataCommand,
}

/// Data subcommands
#[derive(Subcommand, Debug)]
pub enum DataCommand {
    /// Show a data file's sections, or one layered case
    Show(ShowArgs),

    /// List case names in file order
    Cases(CasesArgs),

    /// Show which case a test function resolves to
    Resolve(ResolveArgs),
}

/// Arguments for `data show`
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Data file name (.json optional)
    pub file: String,

    /// Show this case layered over common and environment data
    #[arg(short, long)]
    pub case: Option<String>,

    /// Environment section to apply
    #[arg(short, long, env = TEST_ENV)]
    pub env: Option<String>,

    /// Directory holding test-data files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for `data cases`
#[derive(Args, Debug)]
pub struct CasesArgs {
    /// Data file name (.json optional)
    pub file: String,

    /// Directory holding test-data files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for `data resolve`
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Test function name, module path allowed
    pub test_fn: String,

    /// Data file to resolve against
    #[arg(short, long)]
    pub file: Option<String>,

    /// Directory holding test-data files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
