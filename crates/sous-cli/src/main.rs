//! Sous CLI - command-line front end for the recipe assistant
//!
//! This is the main entry point for the `sous` binary, providing commands
//! for generating, modifying and saving recipes and for inspecting the
//! provider's model catalog.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;
mod store;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    control::set_override(cli.use_color());

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => process::exit(0),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!(
                "{}",
                error::format_error(&e, control::SHOULD_COLORIZE.should_colorize())
            );
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic
#[instrument(skip(cli), fields(command = ?cli.command))]
async fn run(cli: Cli) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let config = {
        let _config_timer = Timer::new("config_loading");
        Config::load_with_file(cli.config.as_deref())?
    };

    let mut output = OutputWriter::new(
        cli.output,
        cli.use_color() && config.output.color,
        cli.quiet,
        config.output.progress,
    );

    tracing::info!(verbosity = cli.verbosity_level(), "Executing command");

    match cli.command {
        Commands::Generate(args) => handlers::handle_generate(args, &config, &mut output).await,
        Commands::Modify(args) => handlers::handle_modify(args, &config, &mut output).await,
        Commands::Recipes(args) => handlers::handle_recipes(args, &config, &mut output).await,
        Commands::Models(args) => handlers::handle_models(args, &config, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, &config, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli) -> Result<()> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_env();

    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["sous", "-vv", "models"]);
        assert_eq!(cli.verbosity_level(), 2);

        let cli = Cli::parse_from(["sous", "--quiet", "recipes", "list"]);
        assert_eq!(cli.verbosity_level(), 0);
    }
}
