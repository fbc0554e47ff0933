//! CLI configuration management
//!
//! Search options come from, in increasing priority: defaults, the TOML
//! file, `RKOPT_*` environment variables, command-line flags.
//!
//! ```toml
//! output_dir = "methods"
//! log_level = "info"
//!
//! [options]
//! starting_point_count = 20
//! worker_count = 4
//! start_mode = "smart"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use rkopt_methods::analysis::ConditionMode;
use rkopt_optimiser::{OptimiseOptions, StartMode, Verbosity};

/// Default configuration file, read when present.
pub const DEFAULT_CONFIG_FILE: &str = "rkopt.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable {name}: {message}")]
    EnvError { name: String, message: String },

    #[error("Invalid search options: {0}")]
    InvalidOptions(String),
}

/// Log levels accepted by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Search options passed to the optimiser
    pub options: OptimiseOptions,
    /// Directory for persisted methods
    pub output_dir: PathBuf,
    /// Log level
    pub log_level: LogLevel,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            options: OptimiseOptions::default(),
            output_dir: PathBuf::from("methods"),
            log_level: LogLevel::Info,
        }
    }
}

/// Command-line overrides of the search options
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub steps: Option<usize>,
    pub starts: Option<usize>,
    pub workers: Option<usize>,
    pub start_mode: Option<StartMode>,
    pub solve_order_first: bool,
    pub problem_type: Option<ConditionMode>,
    pub min_radius: Option<f64>,
    pub seed: Option<u64>,
    pub verbosity: Option<Verbosity>,
    pub output_dir: Option<PathBuf>,
}

fn env_parse<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::EnvError {
                name: name.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl CliConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Apply `RKOPT_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(n) = env_parse("RKOPT_STARTS")? {
            self.options.starting_point_count = n;
        }
        if let Some(n) = env_parse("RKOPT_WORKERS")? {
            self.options.worker_count = n;
        }
        if let Some(seed) = env_parse("RKOPT_SEED")? {
            self.options.seed = Some(seed);
        }
        if let Some(mode) = env_parse::<StartMode>("RKOPT_START_MODE")? {
            self.options.start_mode = mode;
        }
        if let Some(level) = env_parse::<LogLevel>("RKOPT_LOG_LEVEL")? {
            self.log_level = level;
        }
        if let Ok(dir) = std::env::var("RKOPT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Merge with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli: &SearchOverrides) {
        let options = &mut self.options;
        if let Some(steps) = cli.steps {
            options.step_count = steps;
        }
        if let Some(starts) = cli.starts {
            options.starting_point_count = starts;
        }
        if let Some(workers) = cli.workers {
            options.worker_count = workers;
        }
        if let Some(mode) = &cli.start_mode {
            options.start_mode = mode.clone();
        }
        if cli.solve_order_first {
            options.solve_order_conditions_first = true;
        }
        if let Some(mode) = cli.problem_type {
            options.problem_type = mode;
        }
        if let Some(radius) = cli.min_radius {
            options.min_ssp_radius = radius;
        }
        if let Some(seed) = cli.seed {
            options.seed = Some(seed);
        }
        if let Some(verbosity) = cli.verbosity {
            options.display_verbosity = verbosity;
        }
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.options
            .validate()
            .map_err(|e| ConfigError::InvalidOptions(e.to_string()))
    }
}

/// Build configuration from all sources
///
/// An explicit `path` must exist; otherwise [`DEFAULT_CONFIG_FILE`] is read
/// if present.
pub fn build_config(path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut config = match path {
        Some(path) => CliConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            CliConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => CliConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}
