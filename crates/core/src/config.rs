use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Percentage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Constants the solvers used to embed, overridable per product line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    pub buyout_annual_discount_rate: Percentage,
    pub buyout_first_year: u32,
    pub full_product_term_years: u32,
    pub default_annual_degradation: Percentage,
    pub default_guaranteed_production: Percentage,
    pub money_decimal_places: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
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
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub buyout_annual_discount_rate: Option<Percentage>,
    pub full_product_term_years: Option<u32>,
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

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buyout_annual_discount_rate: dec!(3),
            buyout_first_year: 6,
            full_product_term_years: 25,
            default_annual_degradation: dec!(0.5),
            default_guaranteed_production: dec!(95),
            money_decimal_places: 2,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("solquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(rate) = engine.buyout_annual_discount_rate {
                self.engine.buyout_annual_discount_rate = rate;
            }
            if let Some(first_year) = engine.buyout_first_year {
                self.engine.buyout_first_year = first_year;
            }
            if let Some(term) = engine.full_product_term_years {
                self.engine.full_product_term_years = term;
            }
            if let Some(degradation) = engine.default_annual_degradation {
                self.engine.default_annual_degradation = degradation;
            }
            if let Some(guaranteed) = engine.default_guaranteed_production {
                self.engine.default_guaranteed_production = guaranteed;
            }
            if let Some(places) = engine.money_decimal_places {
                self.engine.money_decimal_places = places;
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
        if let Some(value) = read_env("SOLQUOTE_ENGINE_BUYOUT_ANNUAL_DISCOUNT_RATE") {
            self.engine.buyout_annual_discount_rate =
                parse_decimal("SOLQUOTE_ENGINE_BUYOUT_ANNUAL_DISCOUNT_RATE", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_ENGINE_BUYOUT_FIRST_YEAR") {
            self.engine.buyout_first_year = parse_u32("SOLQUOTE_ENGINE_BUYOUT_FIRST_YEAR", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_ENGINE_FULL_PRODUCT_TERM_YEARS") {
            self.engine.full_product_term_years =
                parse_u32("SOLQUOTE_ENGINE_FULL_PRODUCT_TERM_YEARS", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_ENGINE_DEFAULT_ANNUAL_DEGRADATION") {
            self.engine.default_annual_degradation =
                parse_decimal("SOLQUOTE_ENGINE_DEFAULT_ANNUAL_DEGRADATION", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_ENGINE_DEFAULT_GUARANTEED_PRODUCTION") {
            self.engine.default_guaranteed_production =
                parse_decimal("SOLQUOTE_ENGINE_DEFAULT_GUARANTEED_PRODUCTION", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_ENGINE_MONEY_DECIMAL_PLACES") {
            self.engine.money_decimal_places =
                parse_u32("SOLQUOTE_ENGINE_MONEY_DECIMAL_PLACES", &value)?;
        }

        let log_level =
            read_env("SOLQUOTE_LOGGING_LEVEL").or_else(|| read_env("SOLQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SOLQUOTE_LOGGING_FORMAT").or_else(|| read_env("SOLQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(rate) = overrides.buyout_annual_discount_rate {
            self.engine.buyout_annual_discount_rate = rate;
        }
        if let Some(term) = overrides.full_product_term_years {
            self.engine.full_product_term_years = term;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_engine(&self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("solquote.toml"), PathBuf::from("config/solquote.toml")]
        .into_iter()
        .find(|path| path.exists())
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

fn validate_percentage(field: &str, value: Percentage) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > dec!(100) {
        return Err(ConfigError::Validation(format!("{field} must be in range 0..=100")));
    }
    Ok(())
}

fn validate_engine(engine: &EngineConfig) -> Result<(), ConfigError> {
    validate_percentage("engine.buyout_annual_discount_rate", engine.buyout_annual_discount_rate)?;
    validate_percentage("engine.default_annual_degradation", engine.default_annual_degradation)?;
    validate_percentage(
        "engine.default_guaranteed_production",
        engine.default_guaranteed_production,
    )?;

    if engine.full_product_term_years == 0 || engine.full_product_term_years > 50 {
        return Err(ConfigError::Validation(
            "engine.full_product_term_years must be in range 1..=50".to_string(),
        ));
    }

    if engine.buyout_first_year == 0 {
        return Err(ConfigError::Validation(
            "engine.buyout_first_year must be greater than zero".to_string(),
        ));
    }

    if engine.money_decimal_places > 6 {
        return Err(ConfigError::Validation(
            "engine.money_decimal_places must be in range 0..=6".to_string(),
        ));
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
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    buyout_annual_discount_rate: Option<Decimal>,
    buyout_first_year: Option<u32>,
    full_product_term_years: Option<u32>,
    default_annual_degradation: Option<Decimal>,
    default_guaranteed_production: Option<Decimal>,
    money_decimal_places: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
