//! apom: command-line companion for appium-pom suites
//!
//! Shows what a test run would see: the merged config and capabilities,
//! test-data sections, and which case a test function resolves to.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod logging;
mod output;

pub use commands::{
    CasesArgs, Cli, ColorArg, Commands, ConfigArgs, DataArgs, DataCommand, FormatArg, ResolveArgs,
    ShowArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{default_filter, init_logging};
pub use output::{OutputFormat, Printer};
