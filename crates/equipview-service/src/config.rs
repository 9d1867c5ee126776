//! Server configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use equipview_core::{AliasTable, Field};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Upload handling.
    pub ingest: IngestConfig,
    /// Extra header aliases, raw header → canonical field name.
    ///
    /// Merged over the built-in alias table.
    pub aliases: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty
    /// - Ingest timeout and upload limit are within bounds
    /// - Every alias is non-empty and targets a canonical field
    ///
    /// # Example
    ///
    /// ```
    /// use equipview_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.ingest.validate());

        for (alias, target) in &self.aliases {
            let field = format!("aliases.{:?}", alias);
            if alias.trim().is_empty() {
                errors.push(ValidationError {
                    field: field.clone(),
                    message: "alias cannot be empty".to_string(),
                });
            }
            if let Err(e) = target.parse::<Field>() {
                errors.push(ValidationError {
                    field,
                    message: e.to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Built-in aliases with the configured extras applied on top.
    pub fn alias_table(&self) -> Result<AliasTable, ConfigError> {
        let mut table = AliasTable::default();
        let mut errors = Vec::new();

        for (alias, target) in &self.aliases {
            match target.parse::<Field>() {
                Ok(field) => table.insert(alias, field),
                Err(e) => errors.push(ValidationError {
                    field: format!("aliases.{:?}", alias),
                    message: e.to_string(),
                }),
            }
        }

        if errors.is_empty() {
            Ok(table)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            }),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: "port cannot be 0".to_string(),
                }),
                Err(_) => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!("invalid port '{}': must be a number 1-65535", port),
                }),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: equipview_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Minimum ingest timeout in milliseconds.
pub const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum ingest timeout in milliseconds (10 minutes).
pub const MAX_TIMEOUT_MS: u64 = 600_000;
/// Smallest accepted upload limit in bytes.
pub const MIN_UPLOAD_BYTES: usize = 1024;

/// Upload handling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Time allowed from receiving an upload to storing it.
    pub timeout_ms: u64,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl IngestConfig {
    /// Ingest timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate upload configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            errors.push(ValidationError {
                field: "ingest.timeout_ms".to_string(),
                message: format!(
                    "timeout {} ms is out of range ({}-{} ms)",
                    self.timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS
                ),
            });
        }

        if self.max_upload_bytes < MIN_UPLOAD_BYTES {
            errors.push(ValidationError {
                field: "ingest.max_upload_bytes".to_string(),
                message: format!(
                    "upload limit {} is too small (minimum {} bytes)",
                    self.max_upload_bytes, MIN_UPLOAD_BYTES
                ),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `aliases."flow"`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("equipview")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.ingest.timeout_ms, 10_000);
        assert!(config.aliases.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.path, equipview_store::default_db_path());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ingest]
            timeout_ms = 2500

            [aliases]
            "Flow (m3/h)" = "flowrate"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert_eq!(config.ingest.timeout_ms, 2500);
        assert_eq!(config.ingest.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.aliases["Flow (m3/h)"], "flowrate");
        config.validate().unwrap();
    }

    #[test]
    fn test_alias_table_merges_over_defaults() {
        let mut config = Config::default();
        config
            .aliases
            .insert("Flow (m3/h)".to_string(), "flowrate".to_string());

        let table = config.alias_table().unwrap();
        assert_eq!(table.lookup("flow (m3/h)"), Some(Field::Flowrate));
        assert_eq!(table.lookup("Equipment Name"), Some(Field::EquipmentName));
    }

    #[test]
    fn test_unknown_alias_target_is_rejected() {
        let mut config = Config::default();
        config
            .aliases
            .insert("humidity %".to_string(), "humidity".to_string());

        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        assert!(config.alias_table().is_err());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = Config {
            server: ServerConfig {
                bind: "localhost".to_string(),
            },
            storage: StorageConfig {
                path: PathBuf::new(),
            },
            ingest: IngestConfig {
                timeout_ms: 0,
                max_upload_bytes: 10,
            },
            aliases: BTreeMap::from([(" ".to_string(), "type".to_string())]),
        };

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"server.bind"));
                assert!(fields.contains(&"storage.path"));
                assert!(fields.contains(&"ingest.timeout_ms"));
                assert!(fields.contains(&"ingest.max_upload_bytes"));
                assert_eq!(errors.len(), 5);
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_server_port_validation() {
        let invalid = |bind: &str| {
            ServerConfig {
                bind: bind.to_string(),
            }
            .validate()
        };
        assert!(invalid("127.0.0.1:0")[0].message.contains("port cannot be 0"));
        assert!(invalid("127.0.0.1:http")[0].message.contains("invalid port"));
        assert!(invalid("[::1]:8000").is_empty());
    }

    #[test]
    fn test_config_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("server.toml");
        std::fs::write(
            &config_path,
            r#"
            [server]
            bind = "0.0.0.0:9090"

            [storage]
            path = "/tmp/equipview.db"

            [aliases]
            "Temp (C)" = "temperature"
            "#,
        )
        .unwrap();

        let loaded = Config::load(&config_path).unwrap();
        loaded.validate().unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/equipview.db"));
        assert_eq!(loaded.aliases["Temp (C)"], "temperature");
        assert_eq!(loaded.ingest.timeout_ms, 10_000);
    }

    #[test]
    fn test_config_load_rejects_bad_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("server.toml");
        std::fs::write(&config_path, "[ingest]\ntimeout_ms = \"soon\"\n").unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/equipview/server.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
