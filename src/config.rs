use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern");
}

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
}

/// Aliases and layout used when building and printing query blocks
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Alias bound to the root container (`FROM root c`)
    #[validate(custom(function = "validate_identifier"))]
    pub root_alias: String,

    /// Name the container is addressed by in FROM
    #[validate(custom(function = "validate_identifier"))]
    pub root_container: String,

    /// Base alias for joined sources; made unique per block
    #[validate(custom(function = "validate_identifier"))]
    pub join_alias: String,

    /// Spaces per nesting level for multi-line subqueries
    #[validate(range(min = 1, max = 16, message = "Indent width must be between 1 and 16"))]
    pub indent_width: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            root_alias: "c".to_string(),
            root_container: "root".to_string(),
            join_alias: "a".to_string(),
            indent_width: 4,
        }
    }
}

impl QueryConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            root_alias: env::var("DOCSQL_ROOT_ALIAS").unwrap_or_else(|_| "c".to_string()),
            root_container: env::var("DOCSQL_ROOT_CONTAINER").unwrap_or_else(|_| "root".to_string()),
            join_alias: env::var("DOCSQL_JOIN_ALIAS").unwrap_or_else(|_| "a".to_string()),
            indent_width: parse_env_var("DOCSQL_INDENT_WIDTH", "4")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file. Missing keys take their defaults.
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

        config.validate()?;
        Ok(config)
    }
}

fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("identifier");
        err.message = Some(format!("'{}' is not a valid alias", value).into());
        Err(err)
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
