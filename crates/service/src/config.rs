//! Service configuration.
//!
//! Every section and field is optional; omitted values take their defaults.
//!
//! # Example
//!
//! ```toml
//! [service]
//! name = "folio"
//!
//! [pagination]
//! default_page_size = 25
//! max_page_size = 100
//! coalesce_lists = true
//!
//! [events]
//! capacity = 256
//!
//! [log]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration, passed explicitly to the components that need it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub service: ServiceConfig,
    pub pagination: PaginationConfig,
    pub events: EventsConfig,
    pub log: LogConfig,
}

/// `[service]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported by `version()` and attached to log lines.
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "folio".to_string(),
        }
    }
}

/// `[pagination]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    /// Page size the process layer uses when a caller gives none.
    pub default_page_size: usize,
    /// Largest page a caller may request.
    pub max_page_size: usize,
    /// Collapse identical concurrent list queries into one store scan.
    pub coalesce_lists: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
            coalesce_lists: true,
        }
    }
}

/// `[events]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// Buffered events, both queued for the broadcaster and per subscriber.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"folio_query=debug"`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read, parse, and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pagination;
        if p.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "pagination.max_page_size must be at least 1".into(),
            ));
        }
        if p.default_page_size == 0 || p.default_page_size > p.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "pagination.default_page_size must be between 1 and {}",
                p.max_page_size
            )));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Invalid(
                "events.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pagination.max_page_size, 100);
        assert!(config.pagination.coalesce_lists);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [pagination]
            max_page_size = 10
            default_page_size = 5

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.pagination.max_page_size, 10);
        assert_eq!(config.pagination.default_page_size, 5);
        assert!(config.pagination.coalesce_lists);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.service.name, "folio");
    }

    #[test]
    fn default_above_max_is_invalid() {
        let err = Config::from_toml_str(
            r#"
            [pagination]
            max_page_size = 10
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let err = Config::from_toml_str("[events]\ncapacity = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml_str("[pagination]\npage = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
