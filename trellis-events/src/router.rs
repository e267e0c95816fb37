//! Event router

use crate::args::EventArgs;
use crate::config::RouterConfig;
use crate::designated::DesignatedThread;
use crate::dispatch::{Dispatch, DispatchMode, HandlerErrorHook};
use crate::error::{DesignatedThreadError, HandlerExecutionError, Result, RouterError};
use crate::executor::AsyncExecutor;
use crate::handler::EventHandler;
use crate::registry::{Added, ListenerId, Registry, Slot, Snapshot, listener_id};
use crate::subscription::Subscription;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, trace};

pub(crate) struct RouterInner {
    pub(crate) registry: Registry,
    designated: Option<Arc<dyn DesignatedThread>>,
    executor: AsyncExecutor,
    on_error: Option<HandlerErrorHook>,
}

/// Name- and catch-all-addressed publish/subscribe router
///
/// Cloning is cheap; every clone shares the same registry and executors.
/// An application owns one router and hands clones to the components that
/// publish or subscribe.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

/// Non-owning reference to an [`EventRouter`]
///
/// Handlers that need to publish can hold one of these without keeping the
/// router, and therefore themselves, alive.
#[derive(Clone)]
pub struct WeakEventRouter {
    inner: Weak<RouterInner>,
}

impl WeakEventRouter {
    /// Get the router back if it still exists
    pub fn upgrade(&self) -> Option<EventRouter> {
        self.inner.upgrade().map(|inner| EventRouter { inner })
    }
}

fn validate_name(event: &str) -> Result<&str> {
    if event.trim().is_empty() {
        return Err(RouterError::InvalidArgument(
            "event name must not be blank".to_string(),
        ));
    }
    Ok(event)
}

impl EventRouter {
    /// Create a router with the default configuration
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a router from a configuration
    pub fn with_config(config: RouterConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Start building a router
    pub fn builder() -> EventRouterBuilder {
        EventRouterBuilder::new()
    }

    /// Non-owning reference to this router
    pub fn downgrade(&self) -> WeakEventRouter {
        WeakEventRouter {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn add(&self, event: Option<&str>, id: ListenerId, slot: Slot) -> Added {
        let added = self.inner.registry.add(event, id, slot);
        match added {
            Added::Inserted => {
                debug!("Registered listener for event: {}", event.unwrap_or("*"));
            }
            Added::AlreadyRegistered(retention) => {
                trace!(
                    "Listener already registered ({:?}) for event: {}",
                    retention,
                    event.unwrap_or("*")
                );
            }
        }
        added
    }

    /// Register a catch-all listener, invoked for every event.
    ///
    /// Registering the same handler twice has no effect.
    pub fn add_listener(&self, handler: Arc<dyn EventHandler>) {
        let id = listener_id(&handler);
        self.add(None, id, Slot::strong(handler));
    }

    /// Register a listener for one event name
    pub fn add_listener_for(&self, event: &str, handler: Arc<dyn EventHandler>) -> Result<()> {
        let event = validate_name(event)?;
        let id = listener_id(&handler);
        self.add(Some(event), id, Slot::strong(handler));
        Ok(())
    }

    /// Register a catch-all listener without keeping it alive.
    ///
    /// Once every other `Arc` to `handler` is gone the listener is no longer
    /// invoked, and its entry is purged on the next publish that meets it.
    pub fn add_weak_listener<H: EventHandler + 'static>(&self, handler: &Arc<H>) {
        let shared: Arc<dyn EventHandler> = handler.clone();
        self.add(None, listener_id(handler), Slot::weak(&shared));
    }

    /// Register a named listener without keeping it alive
    pub fn add_weak_listener_for<H: EventHandler + 'static>(
        &self,
        event: &str,
        handler: &Arc<H>,
    ) -> Result<()> {
        let event = validate_name(event)?;
        let shared: Arc<dyn EventHandler> = handler.clone();
        self.add(Some(event), listener_id(handler), Slot::weak(&shared));
        Ok(())
    }

    /// Remove a catch-all listener. Does nothing if it is not registered.
    pub fn remove_listener<H: ?Sized>(&self, handler: &Arc<H>) {
        if self.inner.registry.remove(None, listener_id(handler)) {
            debug!("Removed catch-all listener");
        }
    }

    /// Remove a named listener. Does nothing if it is not registered.
    pub fn remove_listener_for<H: ?Sized>(&self, event: &str, handler: &Arc<H>) -> Result<()> {
        let event = validate_name(event)?;
        if self.inner.registry.remove(Some(event), listener_id(handler)) {
            debug!("Removed listener for event: {}", event);
        }
        Ok(())
    }

    /// Register a catch-all listener for the lifetime of the returned handle.
    ///
    /// If `handler` is already registered as a catch-all listener the
    /// existing registration is left alone and the returned handle does not
    /// remove it on drop.
    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = listener_id(&handler);
        let added = self.add(None, id, Slot::strong(handler));
        Subscription::new(Arc::downgrade(&self.inner), None, id, added)
    }

    /// Register a named listener for the lifetime of the returned handle.
    ///
    /// Like [`subscribe`](Self::subscribe), an existing registration of the
    /// same handler under `event` is never removed by this handle.
    pub fn subscribe_to(
        &self,
        event: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<Subscription> {
        let event = validate_name(event)?;
        let id = listener_id(&handler);
        let added = self.add(Some(event), id, Slot::strong(handler));
        Ok(Subscription::new(
            Arc::downgrade(&self.inner),
            Some(event.to_string()),
            id,
            added,
        ))
    }

    /// Publish on the calling thread; returns once every listener has run
    pub fn publish(&self, event: &str, args: impl Into<EventArgs>) -> Result<()> {
        self.publish_with_mode(event, args, DispatchMode::Sync)
    }

    /// Publish on the designated thread; returns once every listener has run.
    ///
    /// Called from the designated thread itself this behaves like
    /// [`publish`](Self::publish).
    pub fn publish_outside(&self, event: &str, args: impl Into<EventArgs>) -> Result<()> {
        self.publish_with_mode(event, args, DispatchMode::Outside)
    }

    /// Publish on a background worker; returns without waiting
    pub fn publish_async(&self, event: &str, args: impl Into<EventArgs>) -> Result<()> {
        self.publish_with_mode(event, args, DispatchMode::Async)
    }

    /// Publish with an explicit dispatch mode.
    ///
    /// Listener failures are logged and reported to the handler-error hook;
    /// they never surface here. Errors returned are a blank event name, an
    /// unavailable designated thread, or an async executor that could not
    /// be started.
    pub fn publish_with_mode(
        &self,
        event: &str,
        args: impl Into<EventArgs>,
        mode: DispatchMode,
    ) -> Result<()> {
        let event = validate_name(event)?;

        if !self.is_enabled() {
            trace!(event, "Router disabled, dropping event");
            return Ok(());
        }

        let snapshot = self.inner.registry.snapshot(event);
        if snapshot.is_empty() {
            trace!(event, "No listeners for event");
            return Ok(());
        }

        let dispatch = Dispatch::new(event, args.into(), snapshot, self.inner.on_error.clone());
        debug!(event, mode = %mode, listeners = dispatch.listener_count(), "Publishing event");

        match mode {
            DispatchMode::Sync => dispatch.run(),
            DispatchMode::Outside => self.dispatch_outside(dispatch)?,
            DispatchMode::Async => self.inner.executor.spawn(move || dispatch.run())?,
        }
        Ok(())
    }

    fn dispatch_outside(&self, dispatch: Dispatch) -> Result<()> {
        let designated = self
            .inner
            .designated
            .as_ref()
            .ok_or(DesignatedThreadError::NotConfigured)?;

        if designated.is_designated_thread() {
            dispatch.run();
            return Ok(());
        }

        designated.run_and_wait(Box::new(move || dispatch.run()))?;
        Ok(())
    }

    /// Listeners a publish of `event` would invoke right now
    pub fn snapshot(&self, event: &str) -> Result<Snapshot> {
        let event = validate_name(event)?;
        Ok(self.inner.registry.snapshot(event))
    }

    /// Turn every publish variant on or off. Registrations are kept.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.registry.set_enabled(enabled);
        debug!("Event router {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Whether publishing is enabled
    pub fn is_enabled(&self) -> bool {
        self.inner.registry.is_enabled()
    }

    /// Total registrations, including weak ones not yet purged
    pub fn listener_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Registrations under `event`, or catch-all registrations for `None`
    pub fn listener_count_for(&self, event: Option<&str>) -> usize {
        self.inner.registry.len_for(event)
    }

    /// Remove every registration
    pub fn clear(&self) {
        self.inner.registry.clear();
        debug!("Cleared all event listeners");
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("enabled", &self.is_enabled())
            .field("listener_count", &self.listener_count())
            .field("designated_thread", &self.inner.designated.is_some())
            .field("executor", &self.inner.executor)
            .finish()
    }
}

/// Event router builder
pub struct EventRouterBuilder {
    config: RouterConfig,
    designated: Option<Arc<dyn DesignatedThread>>,
    runtime: Option<Handle>,
    on_error: Option<HandlerErrorHook>,
}

impl EventRouterBuilder {
    /// Create new event router builder
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            designated: None,
            runtime: None,
            on_error: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Initial enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Concurrent async dispatches on the router-owned runtime
    pub fn async_workers(mut self, workers: usize) -> Self {
        self.config.async_workers = workers;
        self
    }

    /// Thread name for the router-owned runtime
    pub fn worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.worker_thread_name = name.into();
        self
    }

    /// Thread that outside publishes run on
    pub fn designated_thread(mut self, designated: Arc<dyn DesignatedThread>) -> Self {
        self.designated = Some(designated);
        self
    }

    /// Run async publishes on an existing tokio runtime instead of a
    /// router-owned one
    pub fn runtime_handle(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Observe every contained listener failure
    pub fn on_handler_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HandlerExecutionError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Build the event router
    pub fn build(self) -> EventRouter {
        let executor = match self.runtime {
            Some(handle) => AsyncExecutor::shared(handle),
            None => AsyncExecutor::owned(
                self.config.async_workers,
                self.config.worker_thread_name.clone(),
            ),
        };

        EventRouter {
            inner: Arc::new(RouterInner {
                registry: Registry::new(self.config.enabled),
                designated: self.designated,
                executor,
                on_error: self.on_error,
            }),
        }
    }
}

impl Default for EventRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
