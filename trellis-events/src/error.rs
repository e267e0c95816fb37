//! Router error types

use crate::handler::HandlerError;
use std::any::Any;
use thiserror::Error;

/// Errors visible to callers of the router API
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    DesignatedThread(#[from] DesignatedThreadError),

    #[error("Async executor unavailable: {0}")]
    Executor(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;

/// Failures of the designated-thread collaborator
#[derive(Debug, Error)]
pub enum DesignatedThreadError {
    #[error("No designated thread has been configured for this router")]
    NotConfigured,

    #[error("Designated thread unavailable: {0}")]
    Unavailable(String),

    #[error("Designated thread stopped before the task completed")]
    Disconnected,

    #[error("Task panicked on the designated thread: {0}")]
    TaskPanicked(String),
}

/// What went wrong inside a handler
#[derive(Debug, Error)]
pub enum HandlerFailure {
    #[error("{0}")]
    Failed(HandlerError),

    #[error("panicked: {0}")]
    Panicked(String),
}

/// A handler failure, contained at the dispatch boundary.
///
/// These are never returned from a publish call. They are logged and handed
/// to the router's handler-error hook when one is installed.
#[derive(Debug, Error)]
#[error("Handler '{handler}' failed for event '{event}': {cause}")]
pub struct HandlerExecutionError {
    pub event: String,
    pub handler: String,
    #[source]
    pub cause: HandlerFailure,
}

impl HandlerExecutionError {
    pub(crate) fn new(event: &str, handler: &str, cause: HandlerFailure) -> Self {
        Self {
            event: event.to_string(),
            handler: handler.to_string(),
            cause,
        }
    }

    /// Whether the handler panicked rather than returning an error
    pub fn is_panic(&self) -> bool {
        matches!(self.cause, HandlerFailure::Panicked(_))
    }
}

/// Render a panic payload for logs.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
