// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Turn an environment variable name into a configuration key.
///
/// `APP__LIFECYCLE__HANDLER` becomes `app.lifecycle.handler`; single
/// underscores are kept.
pub fn normalize_key(name: &str) -> String {
    name.to_lowercase().replace("__", ".")
}

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all environment variables
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Map `(name, value)` pairs to configuration keys, keeping only the
    /// names under the prefix when one is set
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            match self.prefix {
                Some(ref prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        let trimmed_key = rest.trim_start_matches('_');
                        if !trimmed_key.is_empty() {
                            config.insert(normalize_key(trimmed_key), value);
                        }
                    }
                }
                None => {
                    config.insert(normalize_key(&key), value);
                }
            }
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = if let Some(ref prefix) = self.prefix {
            format!("{}_{}", prefix, key.to_uppercase())
        } else {
            key.to_uppercase()
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("EVENTS__ASYNC_WORKERS"), "events.async_workers");
        assert_eq!(normalize_key("PATH"), "path");
    }

    #[test]
    fn test_collect_with_prefix() {
        let loader = EnvLoader::new(Some("TRELLIS".to_string()));
        let config = loader.collect(vars(&[
            ("TRELLIS_EVENTS__ENABLED", "false"),
            ("TRELLIS_APP__NAME", "demo"),
            ("TRELLIS", "ignored"),
            ("OTHER_VALUE", "ignored"),
        ]));

        assert_eq!(config.len(), 2);
        assert_eq!(config["events.enabled"], "false");
        assert_eq!(config["app.name"], "demo");
    }

    #[test]
    fn test_collect_without_prefix() {
        let loader = EnvLoader::default();
        let config = loader.collect(vars(&[("HOME", "/root")]));

        assert_eq!(config["home"], "/root");
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("NONEXISTENT_VAR_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_env_loader_missing_var() {
        let loader = EnvLoader::new(Some("TRELLIS_TEST".to_string()));
        let result = loader.load_var("MISSING_VAR_67890");

        assert!(result.is_err());
    }
}
