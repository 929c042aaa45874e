use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::query_generator::{DialectKind, PageLimits};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Compiler configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompilerConfig {
    /// Page size used when a document's pager omits `size`
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Default page size must be between 1 and 10000"
    ))]
    pub default_page_size: u64,

    /// Upper bound every requested page size is clamped to
    #[validate(range(
        min = 1,
        max = 100000,
        message = "Max page size must be between 1 and 100000"
    ))]
    pub max_page_size: u64,

    /// Identifier quoting rules
    pub dialect: DialectKind,

    /// Whether compiled sessions are cached
    pub cache_enabled: bool,

    /// Maximum number of cached sessions (LRU eviction)
    #[validate(range(
        min = 1,
        max = 1000000,
        message = "Cache size must be between 1 and 1000000"
    ))]
    pub cache_max_entries: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 500,
            dialect: DialectKind::Mysql,
            cache_enabled: true,
            cache_max_entries: 256,
        }
    }
}

impl CompilerConfig {
    /// Field validation plus cross-field checks
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default page size {} exceeds max page size {}",
                self.default_page_size, self.max_page_size
            )));
        }
        Ok(())
    }

    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            default_page_size: parse_env_var("QRC_DEFAULT_PAGE_SIZE", "20")?,
            max_page_size: parse_env_var("QRC_MAX_PAGE_SIZE", "500")?,
            dialect: parse_env_var("QRC_DIALECT", "mysql")?,
            cache_enabled: parse_env_var("QRC_CACHE_ENABLED", "true")?,
            cache_max_entries: parse_env_var("QRC_CACHE_MAX_ENTRIES", "256")?,
        };

        config.check()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.check()?;
        Ok(config)
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_size: self.default_page_size,
            max_size: self.max_page_size,
        }
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
