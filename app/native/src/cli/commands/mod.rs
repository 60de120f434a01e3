//! CLI command definitions using Clap.
//!
//! - `serve` - run the window server until interrupted
//! - `demo` - run a scripted session and print the resulting windows
//! - `schema` - print the configuration JSON Schema
//! - `config` - configuration file management

use clap::{Parser, Subcommand};

use crate::error::CliError;
use crate::{config, schema};

pub mod config_cmd;
pub mod demo;
pub mod serve;

pub use config_cmd::ConfigCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Winserve - a window server for small devices.
#[derive(Parser, Debug)]
#[command(name = "winserve")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the window server on a headless screen until Ctrl-C.
    Serve,

    /// Run a scripted multi-application session and print the window table.
    Demo {
        /// Print the result as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Output the configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Configuration file management commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<std::path::PathBuf> {
        self.config.as_ref().map(std::path::PathBuf::from)
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), CliError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(CliError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        match &self.command {
            Commands::Serve => {
                let config = config::init();
                crate::init_logging(&config.logging.level);
                serve::execute(config)
            }
            Commands::Demo { json } => {
                let config = config::init();
                crate::init_logging(&config.logging.level);
                demo::execute(config, *json)
            }
            Commands::Schema => {
                println!("{}", schema::generate_schema_json());
                Ok(())
            }
            Commands::Config(cmd) => config_cmd::execute(cmd),
        }
    }
}

/// Build the single-threaded runtime the server and its applications share.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Builder::new_current_thread().enable_all().build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from(["winserve", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parses_demo_json() {
        let cli = Cli::try_parse_from(["winserve", "demo", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Demo { json: true }));
    }

    #[test]
    fn test_cli_global_config_flag() {
        let cli = Cli::try_parse_from(["winserve", "schema", "--config", "/tmp/x.jsonc"]).unwrap();
        assert_eq!(cli.config_path(), Some(std::path::PathBuf::from("/tmp/x.jsonc")));
    }

    #[test]
    fn test_cli_parses_config_init() {
        let cli = Cli::try_parse_from(["winserve", "config", "init", "--stdout"]).unwrap();
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Init { stdout: true, .. })));
    }

    #[test]
    fn test_cli_rejects_missing_config_file() {
        let cli = Cli::try_parse_from(["winserve", "schema", "-c", "/nonexistent/winserve.jsonc"]).unwrap();
        assert!(matches!(cli.execute(), Err(CliError::ConfigError(_))));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["winserve", "bogus"]).is_err());
    }
}
