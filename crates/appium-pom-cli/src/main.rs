//! apom: command-line companion for appium-pom suites
//!
//! ## Usage
//!
//! ```bash
//! apom config --platform ios                  # Merged config and capabilities
//! apom data cases login_test_data             # Case names in file order
//! apom data show login_test_data --case valid_login --env staging
//! apom data resolve tests::test_successful_login
//! ```

use appium_pom_cli::handlers::{execute_cases, execute_config, execute_resolve, execute_show};
use appium_pom_cli::{
    init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, DataCommand, Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    console::set_colors_enabled(config.use_color());
    init_logging(config.verbosity, config.use_color());

    match cli.command {
        Commands::Config(args) => execute_config(&config, &args),
        Commands::Data(data) => match data.command {
            DataCommand::Show(args) => execute_show(&config, &args),
            DataCommand::Cases(args) => execute_cases(&config, &args),
            DataCommand::Resolve(args) => execute_resolve(&config, &args),
        },
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(color)
}
