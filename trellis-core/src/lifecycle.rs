//! Lifecycle handlers for the Trellis application.
//!
//! An application runs at most one handler per [`Lifecycle`] stage. Handlers
//! receive the application, so they can reach its configuration and event
//! router.
//!
//! ## Examples
//!
//! ```
//! use trellis_core::lifecycle::{Lifecycle, LifecycleHandler, LifecycleResult};
//! use trellis_core::Application;
//!
//! struct WarmCaches;
//!
//! impl LifecycleHandler for WarmCaches {
//!     fn execute(&self, app: &Application) -> LifecycleResult {
//!         app.event_router().publish("caches.warm", ())?;
//!         Ok(())
//!     }
//! }
//!
//! let app = Application::builder("demo")
//!     .lifecycle_handler(Lifecycle::Startup, WarmCaches)
//!     .build()
//!     .unwrap();
//! assert!(app.lifecycle_handler(Lifecycle::Startup).is_some());
//! ```

use crate::application::Application;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error type for lifecycle operations
pub type LifecycleResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Stages at which a lifecycle handler may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Initialize,
    Startup,
    Ready,
    Shutdown,
    Stop,
}

impl Lifecycle {
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Initialize => "Initialize",
            Lifecycle::Startup => "Startup",
            Lifecycle::Ready => "Ready",
            Lifecycle::Shutdown => "Shutdown",
            Lifecycle::Stop => "Stop",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Code run at one lifecycle stage
pub trait LifecycleHandler: Send + Sync {
    fn execute(&self, app: &Application) -> LifecycleResult;
}

impl<F> LifecycleHandler for F
where
    F: Fn(&Application) -> LifecycleResult + Send + Sync,
{
    fn execute(&self, app: &Application) -> LifecycleResult {
        self(app)
    }
}

/// Registered lifecycle handlers, one per stage
#[derive(Default)]
pub struct LifecycleHandlers {
    handlers: RwLock<HashMap<Lifecycle, Arc<dyn LifecycleHandler>>>,
}

impl LifecycleHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the handler for `lifecycle`, replacing any previous one
    pub fn register(&self, lifecycle: Lifecycle, handler: Arc<dyn LifecycleHandler>) {
        self.handlers.write().insert(lifecycle, handler);
    }

    pub fn get(&self, lifecycle: Lifecycle) -> Option<Arc<dyn LifecycleHandler>> {
        self.handlers.read().get(&lifecycle).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

impl fmt::Debug for LifecycleHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stages: Vec<&str> = self.handlers.read().keys().map(Lifecycle::name).collect();
        stages.sort_unstable();
        f.debug_struct("LifecycleHandlers")
            .field("stages", &stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces() {
        let handlers = LifecycleHandlers::new();
        assert!(handlers.is_empty());

        let first: Arc<dyn LifecycleHandler> =
            Arc::new(|_: &Application| -> LifecycleResult { Ok(()) });
        let second: Arc<dyn LifecycleHandler> =
            Arc::new(|_: &Application| -> LifecycleResult { Err("second".into()) });

        handlers.register(Lifecycle::Ready, first);
        handlers.register(Lifecycle::Ready, second.clone());

        assert_eq!(handlers.len(), 1);
        let installed = handlers.get(Lifecycle::Ready).unwrap();
        assert_eq!(
            Arc::as_ptr(&installed) as *const (),
            Arc::as_ptr(&second) as *const ()
        );
        assert!(handlers.get(Lifecycle::Stop).is_none());
    }

    #[test]
    fn test_lifecycle_names() {
        assert_eq!(Lifecycle::Initialize.to_string(), "Initialize");
        assert_eq!(Lifecycle::Stop.name(), "Stop");
    }
}
