use crate::config::schema::AppConfig;
use crate::utils::error::{AiDevError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Some(ConfigFormat::Yaml),
            Some("json") => Some(ConfigFormat::Json),
            Some("toml") => Some(ConfigFormat::Toml),
            _ => None,
        }
    }
}

/// Loads, edits and saves the configuration tree.
///
/// The tree is kept as a loosely typed JSON value so that `config set` can
/// write arbitrary keys; [`ConfigManager::settings`] gives the typed view.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    data: Value,
}

impl ConfigManager {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let data = if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path)?;
            let format = ConfigFormat::from_path(&path).ok_or_else(|| {
                AiDevError::config(format!(
                    "Unsupported config file format: {}",
                    path.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| format!(".{}", e))
                        .unwrap_or_else(|| path.display().to_string())
                ))
            })?;
            Self::parse(&content, format)?
        } else {
            tracing::debug!(
                "No configuration at {}, using built-in defaults",
                path.display()
            );
            Self::defaults()
        };

        Ok(Self { path, data })
    }

    pub fn from_value(path: impl Into<PathBuf>, data: Value) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn defaults() -> Value {
        serde_json::to_value(AppConfig::default()).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    fn parse(content: &str, format: ConfigFormat) -> Result<Value> {
        let content = Self::substitute_env_vars(content);
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let value: Value = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        match value {
            Value::Null => Ok(Value::Object(Map::new())),
            Value::Object(_) => Ok(value),
            _ => Err(AiDevError::config("Configuration root must be a mapping")),
        }
    }

    /// 替換環境變數 (例如 ${API_KEY})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Dot-notation lookup, e.g. `output.encoding`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.data, |value, segment| value.as_object()?.get(segment))
            .filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Dot-notation assignment. Missing or non-mapping intermediate nodes are
    /// replaced by empty mappings.
    pub fn set(&mut self, key: &str, value: Value) {
        let segments: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut node = &mut self.data;
        for segment in parents {
            node = Self::ensure_object(node)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        Self::ensure_object(node).insert(last.to_string(), value);
    }

    fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        match node {
            Value::Object(map) => map,
            _ => unreachable!("node was just replaced by an object"),
        }
    }

    /// Typed view of the configuration; missing fields take their defaults.
    pub fn settings(&self) -> Result<AppConfig> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            AiDevError::config(format!("Configuration does not match the schema: {}", e))
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.data)?)
    }

    /// Writes the configuration to `path` (or the path it was loaded from).
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let save_path = path.map(Path::to_path_buf).unwrap_or_else(|| self.path.clone());
        if let Some(parent) = save_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = match ConfigFormat::from_path(&save_path).unwrap_or(ConfigFormat::Yaml) {
            ConfigFormat::Yaml => serde_yaml::to_string(&self.data)?,
            ConfigFormat::Json => serde_json::to_string_pretty(&self.data)?,
            ConfigFormat::Toml => toml::to_string_pretty(&self.data)?,
        };
        std::fs::write(&save_path, content)?;

        tracing::debug!("Configuration saved to {}", save_path.display());
        Ok(save_path)
    }
}

/// Converts a `config set` argument: `true`/`false` become booleans and
/// all-digit strings become integers.
pub fn parse_cli_value(raw: &str) -> Value {
    match raw.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<u64>() {
            return Value::from(n);
        }
    }
    Value::String(raw.to_string())
}
