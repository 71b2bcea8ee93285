//! Session configuration
//!
//! Priority: environment variables > config file > defaults.

use crate::error::{OgmError, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "NEXUS_OGM_CONFIG";

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OgmConfig {
    /// Database statements are sent to
    pub database: String,
    /// Log a warning when a write-looking statement is forced read-only
    pub warn_on_read_only_writes: bool,
    /// Ask the executor for update statistics on write statements
    pub include_statistics: bool,
}

impl Default for OgmConfig {
    fn default() -> Self {
        Self {
            database: "neo4j".to_string(),
            warn_on_read_only_writes: true,
            include_statistics: true,
        }
    }
}

impl OgmConfig {
    /// Parse TOML. Keys may sit at the top level or under an `[ogm]` table.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapped {
            ogm: Option<OgmConfig>,
        }

        let table: toml::Table = toml::from_str(content)?;
        let config = if table.contains_key("ogm") {
            toml::from_str::<Wrapped>(content)?.ogm.unwrap_or_default()
        } else {
            toml::from_str::<OgmConfig>(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded OGM configuration from {:?}", path);
        Ok(config)
    }

    /// Defaults, then the file named by `NEXUS_OGM_CONFIG` if set, then
    /// `NEXUS_OGM_*` variables
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `NEXUS_OGM_*` overrides from a variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(database) = lookup("NEXUS_OGM_DATABASE") {
            self.database = database;
        }
        if let Some(raw) = lookup("NEXUS_OGM_WARN_READ_ONLY_WRITES") {
            self.warn_on_read_only_writes =
                parse_flag("NEXUS_OGM_WARN_READ_ONLY_WRITES", &raw, self.warn_on_read_only_writes);
        }
        if let Some(raw) = lookup("NEXUS_OGM_INCLUDE_STATISTICS") {
            self.include_statistics =
                parse_flag("NEXUS_OGM_INCLUDE_STATISTICS", &raw, self.include_statistics);
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(OgmError::configuration("database name must not be empty"));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str, current: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!("Ignoring invalid boolean {}={:?}", key, raw);
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = OgmConfig::default();
        assert_eq!(config.database, "neo4j");
        assert!(config.warn_on_read_only_writes);
        assert!(config.include_statistics);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OgmConfig::from_toml_str("database = \"movies\"").unwrap();
        assert_eq!(config.database, "movies");
        assert!(config.include_statistics);
    }

    #[test]
    fn test_toml_under_ogm_table() {
        let config = OgmConfig::from_toml_str(
            "[ogm]\ndatabase = \"cineasts\"\ninclude_statistics = false\n",
        )
        .unwrap();
        assert_eq!(config.database, "cineasts");
        assert!(!config.include_statistics);
    }

    #[test]
    fn test_empty_database_rejected() {
        let err = OgmConfig::from_toml_str("database = \"  \"").unwrap_err();
        assert!(matches!(err, OgmError::Configuration(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = OgmConfig::from_toml_str("database = ").unwrap_err();
        assert!(matches!(err, OgmError::Toml(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "warn_on_read_only_writes = false").unwrap();
        let config = OgmConfig::from_file(file.path()).unwrap();
        assert!(!config.warn_on_read_only_writes);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = OgmConfig::from_file("/nonexistent/ogm.toml").unwrap_err();
        assert!(matches!(err, OgmError::Io(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = OgmConfig::from_toml_str("database = \"file\"").unwrap();
        let env = HashMap::from([
            ("NEXUS_OGM_DATABASE", "env"),
            ("NEXUS_OGM_INCLUDE_STATISTICS", "off"),
            ("NEXUS_OGM_WARN_READ_ONLY_WRITES", "maybe"),
        ]);
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.database, "env");
        assert!(!config.include_statistics);
        assert!(config.warn_on_read_only_writes);
    }
}
