//! Router configuration

use serde::Deserialize;

/// Event router configuration
///
/// Deserializable from the `events` section of an application config:
///
/// ```toml
/// [events]
/// enabled = true
/// async_workers = 8
/// worker_thread_name = "app-events"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Initial value of the enabled flag
    pub enabled: bool,

    /// Maximum number of threads running async dispatches concurrently
    /// (router-owned runtime only)
    pub async_workers: usize,

    /// Thread name of the router-owned runtime
    pub worker_thread_name: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            async_workers: 4,
            worker_thread_name: "trellis-event-worker".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.async_workers, 4);
        assert_eq!(config.worker_thread_name, "trellis-event-worker");
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: RouterConfig =
            serde_json::from_str(r#"{ "async_workers": 2, "enabled": false }"#).unwrap();

        assert!(!config.enabled);
        assert_eq!(config.async_workers, 2);
        assert_eq!(config.worker_thread_name, "trellis-event-worker");
    }
}
