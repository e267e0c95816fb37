//! Application bootstrap sequence

use crate::application::{Application, InstanceListener, NewInstance};
use crate::error::{Error, Result};
use crate::events::ApplicationEvent;
use crate::lifecycle::Lifecycle;
use std::sync::Arc;
use tracing::{debug, info};
use trellis_events::{EventArgs, EventHandler, HandlerResult};

/// When true, no lifecycle handler runs
pub const KEY_LIFECYCLE_HANDLER_DISABLE: &str = "app.lifecycle.handler.disable";

/// Bootstrap the application.
///
/// Publishes `BootstrapStart`, wires the instance listeners to
/// `NewInstance`, runs the `Initialize` lifecycle handler and finally
/// publishes `BootstrapEnd`.
pub fn init(app: &Application) -> Result<()> {
    info!("Bootstrapping application '{}'", app.name());
    app.event(ApplicationEvent::BootstrapStart)?;

    for listener in app.instance_listeners() {
        let adapter: Arc<dyn EventHandler> = Arc::new(InstanceListenerAdapter {
            listener: listener.clone(),
        });
        app.event_router()
            .add_listener_for(ApplicationEvent::NewInstance.name(), adapter)?;
    }
    debug!(
        "Wired {} instance listener(s)",
        app.instance_listeners().len()
    );

    run_lifecycle_handler(Lifecycle::Initialize, app)?;

    app.event(ApplicationEvent::BootstrapEnd)
}

/// Run the handler installed for `lifecycle`, if any
pub fn run_lifecycle_handler(lifecycle: Lifecycle, app: &Application) -> Result<()> {
    if app
        .config()
        .get_as_bool(KEY_LIFECYCLE_HANDLER_DISABLE, false)
    {
        info!("Lifecycle handler '{}' has been disabled. SKIPPING.", lifecycle);
        return Ok(());
    }

    let Some(handler) = app.lifecycle_handler(lifecycle) else {
        debug!("Lifecycle handler '{}' not found. SKIPPING.", lifecycle);
        return Ok(());
    };

    info!("Running lifecycle handler '{}'", lifecycle);
    handler.execute(app).map_err(|source| Error::Lifecycle {
        lifecycle: lifecycle.name().to_string(),
        source,
    })
}

/// Routes `NewInstance` events to an [`InstanceListener`].
///
/// Holds the listener only, never the application, so the router does not
/// keep its owner alive.
struct InstanceListenerAdapter {
    listener: Arc<dyn InstanceListener>,
}

impl EventHandler for InstanceListenerAdapter {
    fn on_event(&self, _event: &str, args: &EventArgs) -> HandlerResult {
        let (Some(type_name), Some(artifact_type), Some(instance)) =
            (args.get_str(0), args.get_str(1), args.get_shared(2))
        else {
            return Err("NewInstance expects (type name, artifact type, instance)".into());
        };

        self.listener.on_new_instance(&NewInstance {
            type_name,
            artifact_type,
            instance,
        })
    }

    fn name(&self) -> &str {
        "instance-listener"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleResult;
    use parking_lot::Mutex;
    use trellis_config::ConfigManager;

    fn counting_app(config: ConfigManager) -> (Application, Arc<Mutex<Vec<&'static str>>>) {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let sink = runs.clone();
        let app = Application::builder("bootstrap")
            .config(config)
            .lifecycle_handler(Lifecycle::Initialize, move |_: &Application| -> LifecycleResult {
                sink.lock().push("initialize");
                Ok(())
            })
            .build()
            .unwrap();
        (app, runs)
    }

    #[test]
    fn test_init_runs_initialize_handler() {
        let (app, runs) = counting_app(ConfigManager::new());
        init(&app).unwrap();
        assert_eq!(*runs.lock(), vec!["initialize"]);
    }

    #[test]
    fn test_disabled_handlers_are_skipped() {
        let config = ConfigManager::new();
        config.set(KEY_LIFECYCLE_HANDLER_DISABLE, true).unwrap();

        let (app, runs) = counting_app(config);
        init(&app).unwrap();
        assert!(runs.lock().is_empty());
    }

    #[test]
    fn test_missing_handler_is_noop() {
        let app = Application::builder("empty").build().unwrap();
        assert!(run_lifecycle_handler(Lifecycle::Stop, &app).is_ok());
    }

    #[test]
    fn test_adapter_rejects_malformed_arguments() {
        struct Never;
        impl InstanceListener for Never {
            fn on_new_instance(&self, _: &NewInstance<'_>) -> HandlerResult {
                panic!("must not be called");
            }
        }

        let adapter = InstanceListenerAdapter {
            listener: Arc::new(Never),
        };
        let args = EventArgs::new().with("Only".to_string());
        assert!(adapter.on_event("NewInstance", &args).is_err());
    }
}
