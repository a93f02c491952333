use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use solquote_core::config::{AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

/// Effective value of every setting, with where it came from.
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let engine = &config.engine;
    let entries = vec![
        ConfigEntry {
            key: "engine.buyout_annual_discount_rate",
            value: engine.buyout_annual_discount_rate.to_string(),
            source: source(
                "engine.buyout_annual_discount_rate",
                &["SOLQUOTE_ENGINE_BUYOUT_ANNUAL_DISCOUNT_RATE"],
            ),
        },
        ConfigEntry {
            key: "engine.buyout_first_year",
            value: engine.buyout_first_year.to_string(),
            source: source("engine.buyout_first_year", &["SOLQUOTE_ENGINE_BUYOUT_FIRST_YEAR"]),
        },
        ConfigEntry {
            key: "engine.full_product_term_years",
            value: engine.full_product_term_years.to_string(),
            source: source(
                "engine.full_product_term_years",
                &["SOLQUOTE_ENGINE_FULL_PRODUCT_TERM_YEARS"],
            ),
        },
        ConfigEntry {
            key: "engine.default_annual_degradation",
            value: engine.default_annual_degradation.to_string(),
            source: source(
                "engine.default_annual_degradation",
                &["SOLQUOTE_ENGINE_DEFAULT_ANNUAL_DEGRADATION"],
            ),
        },
        ConfigEntry {
            key: "engine.default_guaranteed_production",
            value: engine.default_guaranteed_production.to_string(),
            source: source(
                "engine.default_guaranteed_production",
                &["SOLQUOTE_ENGINE_DEFAULT_GUARANTEED_PRODUCTION"],
            ),
        },
        ConfigEntry {
            key: "engine.money_decimal_places",
            value: engine.money_decimal_places.to_string(),
            source: source("engine.money_decimal_places", &["SOLQUOTE_ENGINE_MONEY_DECIMAL_PLACES"]),
        },
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: source("logging.level", &["SOLQUOTE_LOGGING_LEVEL", "SOLQUOTE_LOG_LEVEL"]),
        },
        ConfigEntry {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source: source("logging.format", &["SOLQUOTE_LOGGING_FORMAT", "SOLQUOTE_LOG_FORMAT"]),
        },
    ];

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        &entries,
    )
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("solquote.toml"), PathBuf::from("config/solquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) =
        env_keys.iter().find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
