pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shipcalc_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(
    name = "shipcalc",
    about = "Weight tier shipping calculator CLI",
    long_about = "Price orders and shipments against a weight tier cost table, inspect the effective calculator configuration, and check table readiness.",
    after_help = "Examples:\n  shipcalc quote --input order.json\n  shipcalc doctor --json\n  shipcalc config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a shipcalc.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Check availability and compute the shipping cost for an order or shipment")]
    Quote {
        #[arg(long, help = "JSON file holding the order or shipment snapshot")]
        input: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate configuration and the cost table")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the shipping calculators this build can register")]
    Calculators,
}

pub fn init_logging(logging: &LoggingConfig) {
    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    // Commands report config errors themselves; logging falls back to defaults.
    let logging = AppConfig::load(options.clone()).map(|config| config.logging).unwrap_or_default();
    init_logging(&logging);

    let result = match cli.command {
        Command::Quote { input } => commands::quote::run(&input, options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(options, json) }
        }
        Command::Calculators => commands::calculators::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
