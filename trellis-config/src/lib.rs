// Configuration management for the Trellis framework

pub mod convert;
pub mod env;
pub mod error;
pub mod loader;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Main configuration manager
///
/// Values live under dotted keys (`events.async_workers`). Nested objects
/// passed to [`set`](Self::set) or loaded from files are flattened, and
/// [`get`](Self::get) rebuilds a whole section when asked for a key that
/// only has children.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env_prefix: Some(prefix.into()),
        }
    }

    fn insert_flattened(&self, key: &str, value: Value) {
        let mut entries = Vec::new();
        loader::flatten(key, value, &mut entries);

        let mut config = self.config.write();
        for (key, value) in entries {
            config.insert(key, value);
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;
        debug!("Loaded {} environment configuration values", env_vars.len());

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load configuration from .env file
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from file, detecting the format from its name
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file_as(path, ConfigLoader::auto(path)?.format())
    }

    /// Load configuration from file in an explicit format
    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        debug!("Loaded configuration file {}", path.display());
        self.insert_document(data)
    }

    /// Load configuration from a string
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).parse(content)?;
        self.insert_document(data)
    }

    fn insert_document(&self, data: Value) -> Result<()> {
        match data {
            Value::Object(_) => {
                self.insert_flattened("", data);
                Ok(())
            }
            _ => Err(ConfigError::ParseError(
                "Configuration document must be a table".to_string(),
            )),
        }
    }

    /// Set a configuration value.
    ///
    /// Replaces everything stored at or below `key`, and any value stored
    /// directly at one of its parents.
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let mut entries = Vec::new();
        loader::flatten(key, json_value, &mut entries);

        let section = format!("{}.", key);
        let mut config = self.config.write();
        config.retain(|k, _| k != key && !k.starts_with(&section) && !is_parent_key(k, key));
        config.extend(entries);
        Ok(())
    }

    /// Remove a key and every key below it
    pub fn remove(&self, key: &str) {
        let section = format!("{}.", key);
        self.config
            .write()
            .retain(|k, _| k != key && !k.starts_with(&section));
    }

    /// Raw value at `key`, or the section rebuilt from its children
    pub fn value(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        if let Some(value) = config.get(key) {
            return Some(value.clone());
        }

        let section = format!("{}.", key);
        let mut children = config
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(section.as_str()).map(|rest| (rest, v)))
            .peekable();
        children.peek()?;
        Some(loader::unflatten(children))
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        match serde_json::from_value(value.clone()) {
            Ok(typed) => Ok(typed),
            // Environment values arrive as strings
            Err(first) => serde_json::from_value(convert::coerce_scalars(value)).map_err(|_| {
                ConfigError::DeserializationError {
                    key: key.to_string(),
                    message: first.to_string(),
                }
            }),
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Get an integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Get a float value
    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    /// Boolean at `key`, accepting `"true"`/`"yes"`/`"on"`/`"1"` and their
    /// negatives; `default` when missing or unreadable
    pub fn get_as_bool(&self, key: &str, default: bool) -> bool {
        self.value(key)
            .as_ref()
            .and_then(convert::to_bool)
            .unwrap_or(default)
    }

    /// Integer at `key`, parsing numeric strings
    pub fn get_as_int(&self, key: &str, default: i64) -> i64 {
        self.value(key)
            .as_ref()
            .and_then(convert::to_i64)
            .unwrap_or(default)
    }

    /// Float at `key`, parsing numeric strings
    pub fn get_as_float(&self, key: &str, default: f64) -> f64 {
        self.value(key)
            .as_ref()
            .and_then(convert::to_f64)
            .unwrap_or(default)
    }

    /// Value at `key` rendered as a string
    pub fn get_as_string(&self, key: &str, default: &str) -> String {
        self.value(key)
            .as_ref()
            .and_then(convert::to_string)
            .unwrap_or_else(|| default.to_string())
    }

    /// Check if a key, or a section with that name, exists
    pub fn has(&self, key: &str) -> bool {
        let config = self.config.read();
        if config.contains_key(key) {
            return true;
        }
        let section = format!("{}.", key);
        config.keys().any(|k| k.starts_with(&section))
    }

    /// Get all configuration keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let config = self.config.read();
        let mut keys: Vec<String> = config.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Snapshot of every dotted key and its value
    pub fn as_flat_map(&self) -> BTreeMap<String, Value> {
        let config = self.config.read();
        config
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Merge configuration from another manager; its values win
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        if Arc::ptr_eq(&self.config, &other.config) {
            return Ok(());
        }

        let incoming = other.as_flat_map();
        let mut config = self.config.write();
        config.extend(incoming);

        Ok(())
    }
}

/// Whether `candidate` names a section containing `key`
fn is_parent_key(candidate: &str, key: &str) -> bool {
    key.strip_prefix(candidate)
        .is_some_and(|rest| rest.starts_with('.'))
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("keys", &self.config.read().len())
            .field("env_prefix", &self.env_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_has_key() {
        let manager = ConfigManager::new();
        manager.set("existing_key", "value").unwrap();
        manager.set("events.enabled", true).unwrap();

        assert!(manager.has("existing_key"));
        assert!(manager.has("events"));
        assert!(!manager.has("event"));
        assert!(!manager.has("missing_key"));
    }

    #[test]
    fn test_type_conversions() {
        let manager = ConfigManager::new();

        manager.set("string_key", "hello").unwrap();
        manager.set("int_key", 42i64).unwrap();
        manager.set("bool_key", true).unwrap();
        manager.set("float_key", 2.5).unwrap();

        assert_eq!(manager.get_string("string_key").unwrap(), "hello");
        assert_eq!(manager.get_int("int_key").unwrap(), 42);
        assert!(manager.get_bool("bool_key").unwrap());
        assert_eq!(manager.get_float("float_key").unwrap(), 2.5);
    }

    #[test]
    fn test_nested_values_are_flattened() {
        let manager = ConfigManager::new();
        manager
            .set("events", json!({ "enabled": false, "async_workers": 2 }))
            .unwrap();

        assert_eq!(manager.keys(), vec!["events.async_workers", "events.enabled"]);
        assert_eq!(manager.get_int("events.async_workers").unwrap(), 2);
    }

    #[test]
    fn test_section_deserializes_from_children() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Events {
            enabled: bool,
            async_workers: usize,
        }

        let manager = ConfigManager::new();
        manager.set("events.enabled", "false").unwrap();
        manager.set("events.async_workers", "3").unwrap();

        let events: Events = manager.get("events").unwrap();
        assert_eq!(
            events,
            Events {
                enabled: false,
                async_workers: 3
            }
        );
    }

    #[test]
    fn test_coercing_getters() {
        let manager = ConfigManager::new();
        manager.set("flag", "yes").unwrap();
        manager.set("count", "12").unwrap();
        manager.set("ratio", "0.25").unwrap();
        manager.set("number", 5).unwrap();

        assert!(manager.get_as_bool("flag", false));
        assert!(manager.get_as_bool("missing", true));
        assert_eq!(manager.get_as_int("count", 0), 12);
        assert_eq!(manager.get_as_int("flag", 9), 9);
        assert_eq!(manager.get_as_float("ratio", 0.0), 0.25);
        assert_eq!(manager.get_as_string("number", ""), "5");
        assert_eq!(manager.get_as_string("missing", "fallback"), "fallback");
    }

    #[test]
    fn test_deserialization_error_names_key() {
        let manager = ConfigManager::new();
        manager.set("port", "not a number").unwrap();

        let err = manager.get::<u16>("port").unwrap_err();
        assert!(matches!(err, ConfigError::DeserializationError { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_merge_and_remove() {
        let base = ConfigManager::new();
        base.set("app.name", "base").unwrap();
        base.set("app.version", "1").unwrap();

        let overrides = ConfigManager::new();
        overrides.set("app.name", "override").unwrap();

        base.merge(&overrides).unwrap();
        base.merge(&base.clone()).unwrap();
        assert_eq!(base.get_string("app.name").unwrap(), "override");

        base.remove("app");
        assert!(base.keys().is_empty());
    }

    #[test]
    fn test_set_replaces_scalar_with_section() {
        let manager = ConfigManager::new();
        manager.set("cache", 1).unwrap();
        manager.set("cache", serde_json::json!({"size": 2})).unwrap();

        assert_eq!(manager.keys(), vec!["cache.size"]);
        assert_eq!(manager.value("cache"), Some(serde_json::json!({"size": 2})));
    }

    #[test]
    fn test_set_replaces_section_and_parent_scalar() {
        let manager = ConfigManager::new();
        manager.set("cache.size", 2).unwrap();
        manager.set("cache.ttl", 30).unwrap();
        manager.set("cache", "off").unwrap();
        assert_eq!(manager.keys(), vec!["cache"]);

        manager.set("cache.size", 4).unwrap();
        assert_eq!(manager.keys(), vec!["cache.size"]);
        assert_eq!(manager.get_int("cache.size").unwrap(), 4);

        // Siblings sharing a name prefix are kept
        manager.set("cache_dir", "/tmp").unwrap();
        manager.set("cache", 0).unwrap();
        assert_eq!(manager.keys(), vec!["cache", "cache_dir"]);
    }

    #[test]
    fn test_load_str_toml() {
        let manager = ConfigManager::new();
        manager
            .load_str(
                "[app.lifecycle.handler]\ndisable = true\n",
                FileFormat::Toml,
            )
            .unwrap();

        assert!(manager.get_as_bool("app.lifecycle.handler.disable", false));
        assert!(manager.load_str("[1, 2]", FileFormat::Json).is_err());
    }
}
