//! `winserve config`: create the JSONC file and show where it is looked up.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{ServerConfig, config_paths, load_config_from_path};
use crate::error::CliError;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a configuration file with every option commented out at its
    /// default value.
    #[command(after_long_help = r#"Examples:
  winserve config init                       # first search path
  winserve config init --path ./winserve.jsonc
  winserve config init --stdout > my.jsonc"#)]
    Init {
        /// Replace an existing file.
        #[arg(long, short)]
        force: bool,

        /// Where to write instead of the first search path.
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the template instead of writing it.
        #[arg(long)]
        stdout: bool,
    },

    /// List the configuration search paths and which one is in effect.
    Path,
}

/// How a search path relates to the file `serve` and `demo` would load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathState {
    Active,
    Shadowed,
    Missing,
}

impl PathState {
    fn label(self) -> String {
        match self {
            Self::Active => "active".green().to_string(),
            Self::Shadowed => "shadowed".yellow().to_string(),
            Self::Missing => "missing".dimmed().to_string(),
        }
    }
}

#[derive(Tabled)]
struct PathRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "State")]
    state: String,
}

/// The first existing path wins; later existing ones are shadowed.
fn classify(paths: &[PathBuf], exists: impl Fn(&Path) -> bool) -> Vec<PathState> {
    let mut active_seen = false;
    paths
        .iter()
        .map(|path| match (exists(path.as_path()), active_seen) {
            (false, _) => PathState::Missing,
            (true, true) => PathState::Shadowed,
            (true, false) => {
                active_seen = true;
                PathState::Active
            }
        })
        .collect()
}

/// Execute a config subcommand.
///
/// # Errors
///
/// [`CliError::ConfigError`] when `init` would overwrite a file without
/// `--force` or the written file does not load back.
pub fn execute(cmd: &ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Init { stdout: true, .. } => {
            println!("{}", generate_config_template());
            Ok(())
        }
        ConfigCommands::Init { force, path, .. } => {
            let written = init_config(*force, path.clone())?;
            println!("{} {}", "Created".green().bold(), written.display());
            println!("Every option is commented out; uncomment the ones to change.");
            Ok(())
        }
        ConfigCommands::Path => {
            show_config_paths();
            Ok(())
        }
    }
}

fn target_path(custom: Option<PathBuf>) -> PathBuf {
    custom
        .or_else(|| config_paths().into_iter().next())
        .unwrap_or_else(|| PathBuf::from("winserve.jsonc"))
}

/// Write the template and check that it parses to the defaults.
fn init_config(force: bool, custom: Option<PathBuf>) -> Result<PathBuf, CliError> {
    let path = target_path(custom);
    if path.exists() && !force {
        return Err(CliError::ConfigError(format!(
            "{} already exists, pass --force to replace it",
            path.display()
        )));
    }

    create_config_file(&path)
        .map_err(|err| CliError::ConfigError(format!("cannot write {}: {err}", path.display())))?;

    let (config, _) = load_config_from_path(&path)
        .map_err(|err| CliError::ConfigError(format!("{} does not load back: {err}", path.display())))?;
    if config != ServerConfig::default() {
        tracing::warn!(path = %path.display(), "config: template does not match the defaults");
    }
    Ok(path)
}

fn show_config_paths() {
    let paths = config_paths();
    let states = classify(&paths, Path::exists);
    let rows: Vec<PathRow> = paths
        .iter()
        .zip(&states)
        .enumerate()
        .map(|(i, (path, state))| PathRow {
            rank: i + 1,
            path: path.display().to_string(),
            state: state.label(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    if let Some(loaded) = crate::config::get_config_path() {
        println!("{} {}", "loaded:".dimmed(), loaded.display());
    } else if !states.contains(&PathState::Active) {
        println!("No configuration file found; run `winserve config init` to create one.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_existing_path_is_active() {
        let paths: Vec<PathBuf> = ["a.jsonc", "b.jsonc", "c.jsonc"].into_iter().map(PathBuf::from).collect();
        let states = classify(&paths, |p| p != Path::new("a.jsonc"));
        assert_eq!(states, vec![PathState::Missing, PathState::Active, PathState::Shadowed]);
        assert!(classify(&paths, |_| false).iter().all(|s| *s == PathState::Missing));
    }

    #[test]
    fn test_init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        std::fs::write(&path, "{}").unwrap();

        let result = init_config(false, Some(path.clone()));
        assert!(matches!(result, Err(CliError::ConfigError(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_init_config_writes_loadable_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.jsonc");

        assert_eq!(init_config(false, Some(path.clone())).unwrap(), path);
        let (config, _) = load_config_from_path(&path).unwrap();
        assert_eq!(config, ServerConfig::default());

        std::fs::write(&path, "{}").unwrap();
        init_config(true, Some(path.clone())).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().len() > 2);
    }
}
