//! JSON Schema for the configuration file.

use crate::config::ServerConfig;

/// Generates a JSON Schema for the Winserve configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(ServerConfig);
    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!("winserve.schema.json"));
    }
    schema
}

/// Pretty-printed [`generate_schema`].
#[must_use]
pub fn generate_schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_describes_every_section() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema_json()).unwrap();
        assert_eq!(parsed["$id"], "winserve.schema.json");
        assert_eq!(parsed["title"], "ServerConfig");
        for section in ["screen", "messaging", "server", "logging"] {
            assert!(parsed["properties"][section].is_object(), "missing {section}");
        }
    }
}
