//! The application object

use crate::bootstrap;
use crate::error::{Error, Result};
use crate::events::ApplicationEvent;
use crate::lifecycle::{Lifecycle, LifecycleHandler, LifecycleHandlers};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use trellis_config::ConfigManager;
use trellis_events::{
    ArgValue, DesignatedThread, EventArgs, EventRouter, HandlerResult, RouterConfig,
};

/// Configuration section holding the router settings
pub const EVENTS_SECTION: &str = "events";

/// Phases an application moves through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationPhase {
    Initialize,
    Startup,
    Ready,
    Main,
    Shutdown,
}

impl fmt::Display for ApplicationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            ApplicationPhase::Initialize => "Initialize",
            ApplicationPhase::Startup => "Startup",
            ApplicationPhase::Ready => "Ready",
            ApplicationPhase::Main => "Main",
            ApplicationPhase::Shutdown => "Shutdown",
        };
        f.write_str(phase)
    }
}

/// A freshly created application artifact, as seen by an
/// [`InstanceListener`]
pub struct NewInstance<'a> {
    pub type_name: &'a str,
    pub artifact_type: &'a str,
    pub instance: &'a ArgValue,
}

impl NewInstance<'_> {
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }
}

/// Observer of [`ApplicationEvent::NewInstance`] events, wired to the
/// router during bootstrap
pub trait InstanceListener: Send + Sync {
    fn on_new_instance(&self, instance: &NewInstance<'_>) -> HandlerResult;
}

struct ApplicationInner {
    name: String,
    config: ConfigManager,
    router: EventRouter,
    phase: RwLock<ApplicationPhase>,
    initialized: AtomicBool,
    lifecycle: LifecycleHandlers,
    instance_listeners: Vec<Arc<dyn InstanceListener>>,
}

/// Owner of one event router and one configuration.
///
/// Cloning is cheap; all clones are the same application. Components that
/// need the router receive it from here rather than from any global.
#[derive(Clone)]
pub struct Application {
    inner: Arc<ApplicationInner>,
}

impl Application {
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &ConfigManager {
        &self.inner.config
    }

    pub fn event_router(&self) -> &EventRouter {
        &self.inner.router
    }

    pub fn phase(&self) -> ApplicationPhase {
        *self.inner.phase.read()
    }

    pub fn lifecycle_handler(&self, lifecycle: Lifecycle) -> Option<Arc<dyn LifecycleHandler>> {
        self.inner.lifecycle.get(lifecycle)
    }

    pub(crate) fn instance_listeners(&self) -> &[Arc<dyn InstanceListener>] {
        &self.inner.instance_listeners
    }

    fn set_phase(&self, phase: ApplicationPhase) {
        *self.inner.phase.write() = phase;
        debug!("Application '{}' entered phase {}", self.name(), phase);
    }

    fn require_phase(&self, action: &'static str, expected: ApplicationPhase) -> Result<()> {
        let phase = self.phase();
        if phase != expected {
            return Err(Error::InvalidPhase { action, phase });
        }
        Ok(())
    }

    /// Publish a phase event carrying this application
    pub(crate) fn event(&self, event: ApplicationEvent) -> Result<()> {
        self.inner
            .router
            .publish(event.name(), EventArgs::new().with(self.clone()))?;
        Ok(())
    }

    /// Run the bootstrap sequence.
    ///
    /// Any later call returns [`Error::InvalidPhase`] without bootstrapping
    /// again.
    pub fn initialize(&self) -> Result<()> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidPhase {
                action: "initialize",
                phase: self.phase(),
            });
        }
        bootstrap::init(self)
    }

    pub fn startup(&self) -> Result<()> {
        if !self.inner.initialized.load(Ordering::SeqCst) {
            self.initialize()?;
        }
        self.require_phase("start up", ApplicationPhase::Initialize)?;

        self.set_phase(ApplicationPhase::Startup);
        self.event(ApplicationEvent::StartupStart)?;
        bootstrap::run_lifecycle_handler(Lifecycle::Startup, self)?;
        self.event(ApplicationEvent::StartupEnd)
    }

    pub fn ready(&self) -> Result<()> {
        self.require_phase("become ready", ApplicationPhase::Startup)?;

        self.set_phase(ApplicationPhase::Ready);
        self.event(ApplicationEvent::ReadyStart)?;
        bootstrap::run_lifecycle_handler(Lifecycle::Ready, self)?;
        self.event(ApplicationEvent::ReadyEnd)?;

        self.set_phase(ApplicationPhase::Main);
        info!("Application '{}' is ready", self.name());
        Ok(())
    }

    /// Run the shutdown and stop stages, then disable the router.
    ///
    /// Calling it again once the application is shut down does nothing.
    pub fn shutdown(&self) -> Result<()> {
        if self.phase() == ApplicationPhase::Shutdown {
            return Ok(());
        }

        self.set_phase(ApplicationPhase::Shutdown);
        self.event(ApplicationEvent::ShutdownStart)?;
        bootstrap::run_lifecycle_handler(Lifecycle::Shutdown, self)?;

        self.event(ApplicationEvent::StopStart)?;
        bootstrap::run_lifecycle_handler(Lifecycle::Stop, self)?;
        self.event(ApplicationEvent::StopEnd)?;

        self.inner.router.set_enabled(false);
        info!("Application '{}' has shut down", self.name());
        Ok(())
    }

    /// Announce a new artifact instance to the [`InstanceListener`]s
    pub fn new_instance<T>(&self, type_name: &str, artifact_type: &str, instance: T) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        let args = EventArgs::new()
            .with(type_name.to_string())
            .with(artifact_type.to_string())
            .with(instance);
        self.inner
            .router
            .publish(ApplicationEvent::NewInstance.name(), args)?;
        Ok(())
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("name", &self.inner.name)
            .field("phase", &self.phase())
            .field("router", &self.inner.router)
            .finish()
    }
}

/// Application builder
pub struct ApplicationBuilder {
    name: String,
    config: ConfigManager,
    router: Option<EventRouter>,
    designated: Option<Arc<dyn DesignatedThread>>,
    lifecycle: LifecycleHandlers,
    instance_listeners: Vec<Arc<dyn InstanceListener>>,
}

impl ApplicationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ConfigManager::new(),
            router: None,
            designated: None,
            lifecycle: LifecycleHandlers::new(),
            instance_listeners: Vec::new(),
        }
    }

    pub fn config(mut self, config: ConfigManager) -> Self {
        self.config = config;
        self
    }

    /// Use a router built elsewhere instead of one built from the
    /// `events` configuration section.
    ///
    /// Such a router carries its own designated thread, so it cannot be
    /// combined with [`designated_thread`](Self::designated_thread).
    pub fn event_router(mut self, router: EventRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn designated_thread(mut self, designated: Arc<dyn DesignatedThread>) -> Self {
        self.designated = Some(designated);
        self
    }

    pub fn lifecycle_handler<H>(self, lifecycle: Lifecycle, handler: H) -> Self
    where
        H: LifecycleHandler + 'static,
    {
        self.lifecycle.register(lifecycle, Arc::new(handler));
        self
    }

    pub fn instance_listener<L>(mut self, listener: L) -> Self
    where
        L: InstanceListener + 'static,
    {
        self.instance_listeners.push(Arc::new(listener));
        self
    }

    pub fn build(self) -> Result<Application> {
        let router = match self.router {
            Some(_) if self.designated.is_some() => {
                return Err(Error::Setup(
                    "a designated thread cannot be added to a supplied event router; \
                     configure it on the router builder instead"
                        .to_string(),
                ));
            }
            Some(router) => router,
            None => {
                let router_config = if self.config.has(EVENTS_SECTION) {
                    self.config.get::<RouterConfig>(EVENTS_SECTION)?
                } else {
                    RouterConfig::default()
                };
                let mut builder = EventRouter::builder().config(router_config);
                if let Some(designated) = self.designated {
                    builder = builder.designated_thread(designated);
                }
                builder.build()
            }
        };

        Ok(Application {
            inner: Arc::new(ApplicationInner {
                name: self.name,
                config: self.config,
                router,
                phase: RwLock::new(ApplicationPhase::Initialize),
                initialized: AtomicBool::new(false),
                lifecycle: self.lifecycle,
                instance_listeners: self.instance_listeners,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleResult;
    use parking_lot::Mutex;
    use trellis_events::handler_fn;

    fn record_all_events(app: &Application) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        app.event_router().add_listener(handler_fn("recorder", move |event, _| {
            sink.lock().push(event.to_string());
            Ok(())
        }));
        seen
    }

    #[test]
    fn test_router_config_from_events_section() {
        let config = ConfigManager::new();
        config.set("events.enabled", "false").unwrap();

        let app = Application::builder("quiet").config(config).build().unwrap();
        assert!(!app.event_router().is_enabled());
    }

    #[test]
    fn test_malformed_events_section() {
        let config = ConfigManager::new();
        config.set("events.async_workers", "many").unwrap();

        let err = Application::builder("broken").config(config).build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_supplied_router_rejects_designated_thread() {
        let designated = Arc::new(trellis_events::DedicatedThread::spawn("setup-ui").unwrap());

        let err = Application::builder("conflict")
            .event_router(EventRouter::new())
            .designated_thread(designated)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Setup(_)));
    }

    #[test]
    fn test_second_initialize_is_rejected() {
        let runs = Arc::new(Mutex::new(0));
        let sink = runs.clone();
        let app = Application::builder("once")
            .lifecycle_handler(Lifecycle::Initialize, move |_: &Application| -> LifecycleResult {
                *sink.lock() += 1;
                Ok(())
            })
            .build()
            .unwrap();

        app.initialize().unwrap();
        let err = app.initialize().unwrap_err();
        assert!(matches!(err, Error::InvalidPhase { action: "initialize", .. }));
        assert_eq!(*runs.lock(), 1);
    }

    #[test]
    fn test_full_lifecycle_publishes_phase_events() {
        let app = Application::builder("demo").build().unwrap();
        let seen = record_all_events(&app);

        app.startup().unwrap();
        app.ready().unwrap();
        assert_eq!(app.phase(), ApplicationPhase::Main);
        app.shutdown().unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                "BootstrapStart",
                "BootstrapEnd",
                "StartupStart",
                "StartupEnd",
                "ReadyStart",
                "ReadyEnd",
                "ShutdownStart",
                "StopStart",
                "StopEnd",
            ]
        );
        assert!(!app.event_router().is_enabled());

        // Second shutdown is a no-op
        app.shutdown().unwrap();
        assert_eq!(seen.lock().len(), 9);
    }

    #[test]
    fn test_phase_order_is_enforced() {
        let app = Application::builder("demo").build().unwrap();

        let err = app.ready().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPhase {
                phase: ApplicationPhase::Initialize,
                ..
            }
        ));

        app.initialize().unwrap();
        assert!(app.initialize().is_err());
    }

    #[test]
    fn test_phase_events_carry_application() {
        let app = Application::builder("carrier").build().unwrap();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        app.event_router()
            .add_listener_for(
                ApplicationEvent::StartupStart.name(),
                handler_fn("carrier", move |_, args| {
                    let app = args.get::<Application>(0).ok_or("missing application")?;
                    sink.lock().push(app.name().to_string());
                    Ok(())
                }),
            )
            .unwrap();

        app.startup().unwrap();
        assert_eq!(*names.lock(), vec!["carrier"]);
    }

    #[test]
    fn test_lifecycle_handler_failure_stops_phase() {
        let app = Application::builder("failing")
            .lifecycle_handler(Lifecycle::Startup, |_: &Application| -> LifecycleResult {
                Err("database unreachable".into())
            })
            .build()
            .unwrap();
        let seen = record_all_events(&app);

        let err = app.startup().unwrap_err();
        assert!(matches!(err, Error::Lifecycle { ref lifecycle, .. } if lifecycle == "Startup"));
        assert!(!seen.lock().contains(&"StartupEnd".to_string()));
    }

    #[test]
    fn test_new_instance_reaches_instance_listeners() {
        struct Collect(Arc<Mutex<Vec<(String, String, u32)>>>);

        impl InstanceListener for Collect {
            fn on_new_instance(&self, instance: &NewInstance<'_>) -> HandlerResult {
                let value = *instance.downcast::<u32>().ok_or("unexpected instance type")?;
                self.0.lock().push((
                    instance.type_name.to_string(),
                    instance.artifact_type.to_string(),
                    value,
                ));
                Ok(())
            }
        }

        let created = Arc::new(Mutex::new(Vec::new()));
        let app = Application::builder("artifacts")
            .instance_listener(Collect(created.clone()))
            .build()
            .unwrap();

        // Not wired before bootstrap
        app.new_instance("Counter", "model", 1u32).unwrap();
        assert!(created.lock().is_empty());

        app.initialize().unwrap();
        app.new_instance("Counter", "model", 2u32).unwrap();
        assert_eq!(
            *created.lock(),
            vec![("Counter".to_string(), "model".to_string(), 2)]
        );
    }
}
