pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use solquote_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "solquote",
    about = "Solquote quote pricing CLI",
    long_about = "Price solar system designs and solve loan, lease and ESA schedules from JSON inputs.",
    after_help = "Examples:\n  solquote buildup --input quote.json\n  solquote lease --input esa.json\n  solquote config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a solquote.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price a system design into a quote cost buildup")]
    Buildup {
        #[arg(long, help = "JSON file with the design, partner config and selections")]
        input: PathBuf,
    },
    #[command(about = "Solve a loan amortization schedule")]
    Loan {
        #[arg(long, help = "JSON file with loan attributes")]
        input: PathBuf,
    },
    #[command(about = "Project lease or ESA payments, production and buyout values")]
    Lease {
        #[arg(long, help = "JSON file with lease/esa attributes and system production")]
        input: PathBuf,
    },
    #[command(about = "Annotate financial products against a system design")]
    Eligibility {
        #[arg(long, help = "JSON file with products and the design summary")]
        input: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let result = match cli.command {
        Command::Config => commands::config::run(&options),
        Command::Buildup { input } => {
            with_config("buildup", options, |config| commands::buildup::run(config, &input))
        }
        Command::Loan { input } => {
            with_config("loan", options, |config| commands::loan::run(config, &input))
        }
        Command::Lease { input } => {
            with_config("lease", options, |config| commands::lease::run(config, &input))
        }
        Command::Eligibility { input } => {
            with_config("eligibility", options, |config| commands::eligibility::run(config, &input))
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn with_config(
    command: &str,
    options: LoadOptions,
    run: impl FnOnce(&AppConfig) -> CommandResult,
) -> CommandResult {
    match AppConfig::load(options) {
        Ok(config) => {
            init_logging(&config);
            run(&config)
        }
        Err(error) => CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        ),
    }
}

/// Logs go to stderr so stdout carries only the command outcome.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "cli.logging.already_initialized", "subscriber already set");
    }
}
