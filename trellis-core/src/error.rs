// Error types for the Trellis framework

use crate::application::ApplicationPhase;
use thiserror::Error;
use trellis_config::ConfigError;
use trellis_events::RouterError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Event router error: {0}")]
    Router(#[from] RouterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lifecycle handler '{lifecycle}' failed: {source}")]
    Lifecycle {
        lifecycle: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Cannot {action} while application is in phase {phase}")]
    InvalidPhase {
        action: &'static str,
        phase: ApplicationPhase,
    },

    #[error("Invalid application setup: {0}")]
    Setup(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_error_converts() {
        let err: Error = RouterError::InvalidArgument("blank".to_string()).into();
        assert!(matches!(err, Error::Router(_)));
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn test_lifecycle_error_display() {
        let err = Error::Lifecycle {
            lifecycle: "Startup".to_string(),
            source: "no database".into(),
        };
        assert_eq!(
            err.to_string(),
            "Lifecycle handler 'Startup' failed: no database"
        );
    }
}
