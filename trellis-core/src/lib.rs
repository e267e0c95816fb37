// Core library for the Trellis application framework
// Owns the application object, its lifecycle and the bootstrap sequence

//! ## Examples
//!
//! ```
//! use trellis_core::{Application, ApplicationEvent, ApplicationPhase};
//! use trellis_events::handler_fn;
//!
//! let app = Application::builder("demo").build().unwrap();
//! app.event_router()
//!     .add_listener_for(
//!         ApplicationEvent::ReadyEnd.name(),
//!         handler_fn("ready", |_, _| {
//!             println!("ready");
//!             Ok(())
//!         }),
//!     )
//!     .unwrap();
//!
//! app.startup().unwrap();
//! app.ready().unwrap();
//! assert_eq!(app.phase(), ApplicationPhase::Main);
//! app.shutdown().unwrap();
//! ```

pub mod application;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod logging;

// Re-export commonly used types
pub use application::{
    Application, ApplicationBuilder, ApplicationPhase, EVENTS_SECTION, InstanceListener,
    NewInstance,
};
pub use error::{Error, Result};
pub use events::ApplicationEvent;
pub use lifecycle::{Lifecycle, LifecycleHandler, LifecycleHandlers, LifecycleResult};
