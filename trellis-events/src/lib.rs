//! Event routing for Trellis applications
//!
//! This crate provides an in-process publish/subscribe router addressed by
//! event name, with three dispatch disciplines.
//!
//! ## Features
//!
//! - **Named and catch-all listeners** - Listeners for one event name, or for every event
//! - **Three dispatch modes** - Publisher thread, designated thread, or background worker
//! - **Failure isolation** - A failing listener never affects its siblings or the publisher
//! - **Weak retention** - Listeners that stop being invoked once their owner drops them
//! - **Scoped subscriptions** - Registrations released when a handle is dropped
//!
//! ## Quick Start
//!
//! ```
//! use trellis_events::{EventArgs, EventRouter, handler_fn};
//!
//! let router = EventRouter::new();
//!
//! // Catch-all listener: sees every event name
//! router.add_listener(handler_fn("audit", |event, _args| {
//!     println!("event: {event}");
//!     Ok(())
//! }));
//!
//! // Named listener
//! router
//!     .add_listener_for("save", handler_fn("saver", |_event, args| {
//!         println!("saving {:?}", args.get_str(0));
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! router.publish("save", EventArgs::new().with("report.txt")).unwrap();
//! router.publish("load", ()).unwrap();
//! ```
//!
//! ## Dispatch Modes
//!
//! | Method | Runs on | Publisher waits |
//! |---|---|---|
//! | [`EventRouter::publish`] | publishing thread | yes |
//! | [`EventRouter::publish_outside`] | the [`DesignatedThread`] | yes |
//! | [`EventRouter::publish_async`] | a background worker | no |
//!
//! Every mode runs the listeners of one publish serially, catch-all listeners
//! first, each group in registration order.
//!
//! ```
//! use std::sync::Arc;
//! use trellis_events::{DedicatedThread, EventRouter, handler_fn};
//!
//! let ui = Arc::new(DedicatedThread::spawn("ui").unwrap());
//! let router = EventRouter::builder()
//!     .designated_thread(ui.clone())
//!     .build();
//!
//! router.add_listener(handler_fn("paint", |_, _| {
//!     assert_eq!(std::thread::current().name(), Some("ui"));
//!     Ok(())
//! }));
//! router.publish_outside("repaint", ()).unwrap();
//! ```
//!
//! ## Configuration
//!
//! ```
//! use trellis_events::EventRouter;
//!
//! let router = EventRouter::builder()
//!     .enabled(true)                  // Initial enabled flag
//!     .async_workers(8)               // Concurrent async dispatches
//!     .worker_thread_name("events")   // Worker thread names
//!     .on_handler_error(|failure| eprintln!("{failure}"))
//!     .build();
//! assert!(router.is_enabled());
//! ```

pub mod args;
pub mod config;
pub mod designated;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod registry;
pub mod router;
pub mod subscription;

mod executor;

pub use args::{ArgValue, EventArgs};
pub use config::RouterConfig;
pub use designated::{DedicatedThread, DesignatedThread, Task};
pub use dispatch::{DispatchMode, HandlerErrorHook};
pub use error::{
    DesignatedThreadError, HandlerExecutionError, HandlerFailure, Result, RouterError,
};
pub use handler::{EventHandler, FnHandler, HandlerError, HandlerResult, handler_fn};
pub use registry::{Retention, Snapshot};
pub use router::{EventRouter, EventRouterBuilder, WeakEventRouter};
pub use subscription::Subscription;
