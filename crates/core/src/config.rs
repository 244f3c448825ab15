use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shipping::weight_tier::WeightTierPreferences;

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub calculator: WeightTierPreferences,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub costs_string: Option<String>,
    pub default_weight: Option<Decimal>,
    pub max_item_size: Option<Decimal>,
    pub handling_fee: Option<Decimal>,
    pub handling_max: Option<Decimal>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["shipcalc.toml", "config/shipcalc.toml"];

impl AppConfig {
    /// Resolves configuration with precedence `overrides > env > file > defaults`.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(calculator) = patch.calculator {
            if let Some(costs_string) = calculator.costs_string {
                self.calculator.costs_string = costs_string;
            }
            if let Some(default_weight) = calculator.default_weight {
                self.calculator.default_weight = default_weight;
            }
            if let Some(max_item_size) = calculator.max_item_size {
                self.calculator.max_item_size = max_item_size;
            }
            if let Some(handling_fee) = calculator.handling_fee {
                self.calculator.handling_fee = handling_fee;
            }
            if let Some(handling_max) = calculator.handling_max {
                self.calculator.handling_max = handling_max;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Read raw: surrounding whitespace and newlines belong to the table.
        if let Some(value) = env::var("SHIPCALC_COSTS_STRING").ok().filter(|v| !v.trim().is_empty())
        {
            self.calculator.costs_string = value;
        }
        if let Some(value) = read_env("SHIPCALC_DEFAULT_WEIGHT") {
            self.calculator.default_weight = parse_decimal("SHIPCALC_DEFAULT_WEIGHT", &value)?;
        }
        if let Some(value) = read_env("SHIPCALC_MAX_ITEM_SIZE") {
            self.calculator.max_item_size = parse_decimal("SHIPCALC_MAX_ITEM_SIZE", &value)?;
        }
        if let Some(value) = read_env("SHIPCALC_HANDLING_FEE") {
            self.calculator.handling_fee = parse_decimal("SHIPCALC_HANDLING_FEE", &value)?;
        }
        if let Some(value) = read_env("SHIPCALC_HANDLING_MAX") {
            self.calculator.handling_max = parse_decimal("SHIPCALC_HANDLING_MAX", &value)?;
        }

        let log_level =
            read_env("SHIPCALC_LOGGING_LEVEL").or_else(|| read_env("SHIPCALC_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SHIPCALC_LOGGING_FORMAT").or_else(|| read_env("SHIPCALC_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(costs_string) = overrides.costs_string {
            self.calculator.costs_string = costs_string;
        }
        if let Some(default_weight) = overrides.default_weight {
            self.calculator.default_weight = default_weight;
        }
        if let Some(max_item_size) = overrides.max_item_size {
            self.calculator.max_item_size = max_item_size;
        }
        if let Some(handling_fee) = overrides.handling_fee {
            self.calculator.handling_fee = handling_fee;
        }
        if let Some(handling_max) = overrides.handling_max {
            self.calculator.handling_max = handling_max;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    /// The cost table itself is not checked here; a malformed table only makes the
    /// weight tier rule unavailable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_calculator(&self.calculator)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_calculator(calculator: &WeightTierPreferences) -> Result<(), ConfigError> {
    let amounts = [
        ("calculator.default_weight", calculator.default_weight),
        ("calculator.max_item_size", calculator.max_item_size),
        ("calculator.handling_fee", calculator.handling_fee),
        ("calculator.handling_max", calculator.handling_max),
    ];

    if let Some((key, value)) = amounts.iter().find(|(_, value)| value.is_sign_negative()) {
        return Err(ConfigError::Validation(format!(
            "{key} must be zero or greater (got {value})"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    calculator: Option<CalculatorPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CalculatorPatch {
    costs_string: Option<String>,
    default_weight: Option<Decimal>,
    max_item_size: Option<Decimal>,
    handling_fee: Option<Decimal>,
    handling_max: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
