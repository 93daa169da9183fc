//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

const ENV_PREFIX: &str = "PARLEY__";

/// How an aliased environment value is interpreted
#[derive(Debug, Clone, Copy)]
enum AliasKind {
    Text,
    /// Integer in `1..=max`; anything else keeps the current value
    PositiveInt { max: u64 },
}

const ENV_ALIASES: &[(&str, &str, AliasKind)] = &[
    ("GEMINI_API_KEY", "provider.api_key", AliasKind::Text),
    ("GEMINI_MODEL", "provider.model", AliasKind::Text),
    ("GEMINI_API_BASE", "provider.api_base", AliasKind::Text),
    (
        "LLM_MAX_OUTPUT_TOKENS_INT",
        "agent.max_output_tokens",
        AliasKind::PositiveInt {
            max: u32::MAX as u64,
        },
    ),
    (
        "USER_HISTORY_MAX_LENGTH",
        "history.max_messages",
        AliasKind::PositiveInt {
            max: usize::MAX as u64,
        },
    ),
];

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".parley"))
            .unwrap_or_else(|| PathBuf::from(".parley"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load a `.env` file from the working directory (or a parent) into the
    /// process environment. A missing file is not an error.
    pub fn load_dotenv() -> Option<PathBuf> {
        dotenv::dotenv().ok()
    }

    /// Load configuration from file and environment, logging ignored
    /// environment values
    pub fn load(&self) -> crate::Result<Config> {
        let (config, warnings) = self.load_with_warnings()?;
        for warning in &warnings {
            warn!("{}", warning);
        }
        Ok(config)
    }

    /// Load configuration and return the ignored environment values
    /// separately, for callers that install logging only after loading
    pub fn load_with_warnings(&self) -> crate::Result<(Config, Vec<String>)> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content).map_err(|e| {
                crate::Error::Config(format!("{}: {}", config_path.display(), e))
            })?;
            merge_values(&mut merged, file_value);
        }

        let warnings = apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok((config, warnings))
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Number(v.into());
    }
    if let Ok(v) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(v) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

fn parse_positive_int(raw: &str, max: u64) -> Option<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| (1..=max).contains(v))
}

fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(last.clone(), value);
    }
}

/// Apply the aliased environment variables, returning one message per
/// value that was ignored
fn apply_alias_overrides(config: &mut Value) -> Vec<String> {
    let mut warnings = Vec::new();
    for (env_key, target_path, kind) in ENV_ALIASES {
        let Ok(raw) = std::env::var(env_key) else {
            continue;
        };

        let value = match kind {
            AliasKind::Text => Value::String(raw),
            AliasKind::PositiveInt { max } => match parse_positive_int(&raw, *max) {
                Some(v) => Value::Number(v.into()),
                None => {
                    warnings.push(format!(
                        "Ignoring {}={:?}: expected an integer in 1..={}, keeping {}",
                        env_key, raw, max, target_path
                    ));
                    continue;
                }
            },
        };

        let path: Vec<String> = target_path.split('.').map(ToString::to_string).collect();
        set_path_value(config, &path, value);
    }
    warnings
}

fn apply_path_overrides(config: &mut Value) {
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if segments.is_empty() {
            continue;
        }
        set_path_value(config, &segments, parse_env_value(&value));
    }
}
