//! Configuration template generation.

use std::fs;
use std::path::Path;

/// Generates a configuration template with every option commented out at
/// its default value.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// Winserve Configuration File
// ============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.

{
  // ============================================================================
  // Screen
  // ============================================================================
  // "screen": {
  //   // Size of the headless display in pixels
  //   "width": 1024,
  //   "height": 768
  // },

  // ============================================================================
  // Messaging
  // ============================================================================
  // "messaging": {
  //   // Messages that may exist at once; sends fail when exhausted
  //   "poolSize": 512,
  //
  //   // Queue length of every mailbox
  //   "mailboxCapacity": 64,
  //
  //   // Milliseconds to wait for a synchronous reply
  //   "syncTimeoutMs": 1000
  // },

  // ============================================================================
  // Server loop
  // ============================================================================
  // "server": {
  //   // Milliseconds without traffic before idle work (damage flush) runs
  //   "idleTickMs": 250,
  //
  //   // Activate the window under the pointer on button press
  //   "clickToFocus": true
  // },

  // ============================================================================
  // Logging
  // ============================================================================
  // "logging": {
  //   // Filter used when WINSERVE_LOG is not set
  //   "level": "info"
  // }
}
"#
    .to_string()
}

/// Creates a configuration file with the template at the specified path,
/// creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_config_template())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_template_parses_to_defaults() {
        let template = generate_config_template();
        let stripped = json_comments::StripComments::new(template.as_bytes());
        let config: ServerConfig = serde_json::from_reader(stripped).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_template_mentions_every_section() {
        let template = generate_config_template();
        for section in ["screen", "messaging", "server", "logging", "syncTimeoutMs", "clickToFocus"] {
            assert!(template.contains(section), "missing {section}");
        }
    }

    #[test]
    fn test_create_config_file_makes_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.jsonc");
        create_config_file(&path).unwrap();
        assert!(path.exists());
    }
}
