//! Configuration types for Winserve.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Size of the headless screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreenConfig {
    /// Screen width in pixels.
    pub width: u16,
    /// Screen height in pixels.
    pub height: u16,
}

impl Default for ScreenConfig {
    fn default() -> Self { Self { width: 1024, height: 768 } }
}

/// Message pool and mailbox sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MessagingConfig {
    /// Number of messages that may exist at once.
    pub pool_size: usize,
    /// Queue length of the server mailbox and every application mailbox.
    pub mailbox_capacity: usize,
    /// Bound in milliseconds on every synchronous round-trip.
    pub sync_timeout_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self { Self { pool_size: 512, mailbox_capacity: 64, sync_timeout_ms: 1000 } }
}

impl MessagingConfig {
    #[must_use]
    pub const fn sync_timeout(&self) -> Duration { Duration::from_millis(self.sync_timeout_ms) }
}

/// Server loop behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoopConfig {
    /// Receive timeout in milliseconds that drives idle work such as
    /// flushing screen damage.
    pub idle_tick_ms: u64,
    /// Whether a button press activates the window under the pointer.
    pub click_to_focus: bool,
}

impl Default for LoopConfig {
    fn default() -> Self { Self { idle_tick_ms: 250, click_to_focus: true } }
}

impl LoopConfig {
    #[must_use]
    pub fn idle_tick(&self) -> Duration { Duration::from_millis(self.idle_tick_ms.max(1)) }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter directive when `WINSERVE_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string() } }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Headless screen size.
    pub screen: ScreenConfig,
    /// Message pool and queue sizes.
    pub messaging: MessagingConfig,
    /// Server loop behavior.
    pub server: LoopConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "no configuration file found; expected ~/.config/winserve/config.jsonc or ~/.winserve.jsonc"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Configuration file names in the home directory.
const HOME_CONFIG_FILE_NAMES: &[&str] = &[".winserve.jsonc", ".winserve.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/winserve/config.jsonc` or `config.json`, if set
/// 2. `~/.config/winserve/config.jsonc` or `config.json`
/// 3. `~/.winserve.jsonc` or `~/.winserve.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(xdg_config).join("winserve");
        for filename in CONFIG_FILE_NAMES {
            paths.push(dir.join(filename));
        }
    }

    if let Some(home) = dirs::home_dir() {
        let dir = home.join(".config").join("winserve");
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            // XDG_CONFIG_HOME may already be ~/.config.
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        for filename in HOME_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from the first existing file in [`config_paths`].
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if no file exists, otherwise the error
/// from [`load_config_from_path`].
pub fn load_config() -> Result<(ServerConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

/// Loads a JSONC configuration file. Comments are stripped before parsing.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist,
/// [`ConfigError::Io`] if it cannot be read and [`ConfigError::Parse`] if it
/// is not valid configuration JSON.
pub fn load_config_from_path(path: &Path) -> Result<(ServerConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }
    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: ServerConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
