// Trellis - an application framework built around an event router
//
// Components never call each other directly; they publish and listen through
// the router owned by the application.

// Re-export core functionality
pub use trellis_core::*;

// Re-export procedural macros
pub use trellis_macro::event_publisher;

pub use trellis_config as config;
pub use trellis_events as events;

pub use trellis_config::ConfigManager;
pub use trellis_events::{
    DedicatedThread, DesignatedThread, DispatchMode, EventArgs, EventHandler, EventRouter,
    EventRouterBuilder, HandlerExecutionError, Retention, RouterConfig, RouterError, Snapshot,
    Subscription, event_args, handler_fn,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::event_publisher;
    pub use trellis_config::ConfigManager;
    pub use trellis_core::{
        Application, ApplicationEvent, ApplicationPhase, InstanceListener, Lifecycle,
        LifecycleHandler, LifecycleResult, NewInstance,
    };
    pub use trellis_events::{
        DedicatedThread, DesignatedThread, DispatchMode, EventArgs, EventHandler, EventRouter,
        HandlerResult, Subscription, event_args, handler_fn,
    };
}
