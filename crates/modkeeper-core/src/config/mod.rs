//! Configuration loading
//!
//! - Format detection from the file extension (TOML, YAML, JSON)
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - `<PREFIX>_<SECTION>__<KEY>` environment overrides
//! - Validation of the materialized [`CoreConfig`]

mod model;
mod source;

pub use model::{CoreConfig, DatabaseSection, DebugSection, ModulesSection};
pub use source::{
    ConfigSource, DEFAULT_CONFIG, DEFAULT_ENV_PREFIX, FileConfigSource, StaticConfigSource,
    write_default_config,
};

use ::config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use std::path::Path;

/// Configuration error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string.
///
/// Unset variables are left as written.
pub fn substitute_env_vars(content: &str) -> ConfigResult<String> {
    let re_braced = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let result = re_braced.replace_all(content, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    let re_simple = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let result = re_simple.replace_all(&result, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    Ok(result.into_owned())
}

/// Parse `content`, layer environment overrides with `env_prefix` (if any),
/// deserialize and validate.
pub fn parse_config(
    content: &str,
    format: FileFormat,
    env_prefix: Option<&str>,
) -> ConfigResult<CoreConfig> {
    let substituted = substitute_env_vars(content)?;

    let mut builder = Cfg::builder().add_source(File::from_str(&substituted, format));
    if let Some(prefix) = env_prefix {
        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("modules.additional_modules"),
        );
    }

    let config: CoreConfig = builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Deserialize(e.to_string()))?;

    config.validate()?;
    Ok(config)
}
