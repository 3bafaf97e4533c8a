//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use sous_core::RecipeId;

/// Sous - AI recipe assistant
///
/// Generate new recipes, rework saved ones and keep the results, with
/// requests timed, retried and cancellable from the terminal.
#[derive(Parser, Debug)]
#[command(
    name = "sous",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SOUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new recipe
    Generate(GenerateArgs),

    /// Rework a saved recipe
    Modify(ModifyArgs),

    /// List saved recipes or show one
    Recipes(RecipesArgs),

    /// List the provider's models or select one
    Models(ModelsArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the generate command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Extra requirements, e.g. "low carb, under 30 minutes"
    #[arg(short, long, value_name = "TEXT")]
    pub extra: Option<String>,

    /// Recipe file to use as a starting point (JSON, YAML or plain text)
    #[arg(short, long, value_name = "FILE")]
    pub base: Option<PathBuf>,

    /// Model ID to use instead of the configured default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Save the generated recipe
    #[arg(long)]
    pub save: bool,
}

/// Arguments for the modify command
#[derive(Parser, Debug)]
pub struct ModifyArgs {
    /// ID of the saved recipe to modify
    #[arg(short, long, value_name = "ID")]
    pub recipe: RecipeId,

    /// The changes to make, e.g. "make it vegetarian"
    #[arg(long, value_name = "TEXT")]
    pub changes: String,

    /// Model ID to use instead of the configured default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Overwrite the saved recipe with the result
    #[arg(long)]
    pub save: bool,
}

/// Arguments for the recipes command
#[derive(Parser, Debug)]
pub struct RecipesArgs {
    #[command(subcommand)]
    pub action: RecipesAction,
}

/// Saved recipe actions
#[derive(Subcommand, Debug)]
pub enum RecipesAction {
    /// List saved recipes
    List,

    /// Show one saved recipe
    Show {
        /// Recipe ID
        id: RecipeId,
    },
}

/// Arguments for the models command
#[derive(Parser, Debug)]
pub struct ModelsArgs {
    /// Ignore the cached catalog and refetch
    #[arg(long)]
    pub refresh: bool,

    /// Check that a model is available and show its defaults
    #[arg(long, value_name = "ID")]
    pub select: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show(ConfigShowArgs),

    /// Print the configuration file locations that are searched
    Path,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_level() {
        let cli = Cli {
            verbose: 2,
            quiet: false,
            config: None,
            output: OutputFormat::Human,
            no_color: false,
            command: Commands::Models(ModelsArgs {
                refresh: false,
                select: None,
            }),
        };
        assert_eq!(cli.verbosity_level(), 2);

        let quiet_cli = Cli {
            verbose: 2,
            quiet: true,
            ..cli
        };
        assert_eq!(quiet_cli.verbosity_level(), 0);
    }

    #[test]
    fn test_generate_arguments() {
        let cli = Cli::parse_from([
            "sous", "generate", "--extra", "low carb", "--model", "meta/llama-small", "--save",
        ]);
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.extra.as_deref(), Some("low carb"));
                assert_eq!(args.model.as_deref(), Some("meta/llama-small"));
                assert!(args.save);
                assert!(args.base.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_modify_requires_changes() {
        let result = Cli::try_parse_from(["sous", "modify", "--recipe", "3"]);
        assert!(result.is_err());

        let cli = Cli::parse_from(["sous", "-o", "json", "modify", "-r", "3", "--changes", "vegan"]);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Modify(args) => {
                assert_eq!(args.recipe, 3);
                assert_eq!(args.changes, "vegan");
                assert!(!args.save);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["sous", "-q", "-v", "models"]).is_err());
    }
}
