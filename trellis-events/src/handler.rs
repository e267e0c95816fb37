//! Event handler traits

use crate::args::EventArgs;
use std::fmt;
use std::sync::Arc;

/// Error type a handler may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a single handler invocation
pub type HandlerResult = Result<(), HandlerError>;

/// Event handler trait
///
/// Every listener registered with an [`EventRouter`](crate::EventRouter)
/// implements this trait. Catch-all listeners receive the event name of
/// every publish as their leading parameter; named listeners only ever see
/// their own event name and are free to ignore it.
///
/// A returned error (or a panic) is contained by the router: it is logged
/// and the remaining listeners still run.
pub trait EventHandler: Send + Sync {
    /// Handle one published event
    fn on_event(&self, event: &str, args: &EventArgs) -> HandlerResult;

    /// Name used when reporting failures
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed handler
pub struct FnHandler<F>
where
    F: Fn(&str, &EventArgs) -> HandlerResult + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&str, &EventArgs) -> HandlerResult + Send + Sync,
{
    /// Create a new closure handler
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&str, &EventArgs) -> HandlerResult + Send + Sync,
{
    fn on_event(&self, event: &str, args: &EventArgs) -> HandlerResult {
        (self.handler)(event, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnHandler<F>
where
    F: Fn(&str, &EventArgs) -> HandlerResult + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .finish()
    }
}

/// Wrap a closure into a shareable handler.
///
/// The returned `Arc` is the handler's identity: keep a clone of it to
/// remove the registration later.
///
/// ```
/// use trellis_events::{handler_fn, EventRouter};
///
/// let router = EventRouter::new();
/// let audit = handler_fn("audit", |event, _args| {
///     println!("saw {event}");
///     Ok(())
/// });
/// router.add_listener(audit.clone());
/// router.remove_listener(&audit);
/// ```
pub fn handler_fn<F>(name: impl Into<String>, handler: F) -> Arc<FnHandler<F>>
where
    F: Fn(&str, &EventArgs) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(FnHandler::new(name, handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl EventHandler for Plain {
        fn on_event(&self, _event: &str, _args: &EventArgs) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Plain.name().ends_with("Plain"));
    }

    #[test]
    fn test_fn_handler_forwards_arguments() {
        let handler = handler_fn("echo", |event, args| {
            if event == "save" && args.get_str(0) == Some("x") {
                Ok(())
            } else {
                Err("unexpected invocation".into())
            }
        });

        assert_eq!(handler.name(), "echo");
        assert!(handler.on_event("save", &EventArgs::new().with("x")).is_ok());
        assert!(handler.on_event("load", &EventArgs::new()).is_err());
    }
}
