use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which Lua sources become tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Module files; every documented export becomes a tool
    #[serde(default)]
    pub modules: Vec<PathBuf>,
    /// Standalone script files; each becomes one tool
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
    #[serde(default = "default_help_tools")]
    pub help_tools: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            modules: Vec::new(),
            scripts: Vec::new(),
            help_tools: default_help_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_help_tools() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(environment())
            .build()?;

        config.try_deserialize()
    }

    /// Load from an explicit file, still honouring environment overrides
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(environment())
            .build()?;

        config.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("APP")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("adapter.modules")
        .with_list_parse_key("adapter.scripts")
        .try_parsing(true)
}
