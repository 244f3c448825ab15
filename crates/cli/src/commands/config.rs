use std::env;
use std::fs;
use std::path::Path;

use shipcalc_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let calculator = &config.calculator;
    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];

    lines.push(render_line(
        "calculator.costs_string",
        &calculator.costs_string.escape_debug().to_string(),
        source("calculator.costs_string", &["SHIPCALC_COSTS_STRING"]),
    ));
    lines.push(render_line(
        "calculator.default_weight",
        &calculator.default_weight.to_string(),
        source("calculator.default_weight", &["SHIPCALC_DEFAULT_WEIGHT"]),
    ));
    lines.push(render_line(
        "calculator.max_item_size",
        &calculator.max_item_size.to_string(),
        source("calculator.max_item_size", &["SHIPCALC_MAX_ITEM_SIZE"]),
    ));
    lines.push(render_line(
        "calculator.handling_fee",
        &calculator.handling_fee.to_string(),
        source("calculator.handling_fee", &["SHIPCALC_HANDLING_FEE"]),
    ));
    lines.push(render_line(
        "calculator.handling_max",
        &calculator.handling_max.to_string(),
        source("calculator.handling_max", &["SHIPCALC_HANDLING_MAX"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["SHIPCALC_LOGGING_LEVEL", "SHIPCALC_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["SHIPCALC_LOGGING_FORMAT", "SHIPCALC_LOG_FORMAT"]),
    ));

    lines.join("\n")
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
    let env_key = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = env_key {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
