//! Dispatch modes and the per-publish invocation loop

use crate::args::EventArgs;
use crate::error::{HandlerExecutionError, HandlerFailure, panic_message};
use crate::registry::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Where and when the listeners of a publish call run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// On the publishing thread, before the publish call returns
    #[default]
    Sync,
    /// On the designated thread; the publisher waits for completion
    Outside,
    /// On a background worker; the publisher does not wait
    Async,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            DispatchMode::Sync => "sync",
            DispatchMode::Outside => "outside",
            DispatchMode::Async => "async",
        };
        f.write_str(mode)
    }
}

/// Callback receiving every contained handler failure
pub type HandlerErrorHook = Arc<dyn Fn(&HandlerExecutionError) + Send + Sync>;

/// One publish call, ready to run wherever its mode dictates.
pub(crate) struct Dispatch {
    event: String,
    args: EventArgs,
    snapshot: Snapshot,
    on_error: Option<HandlerErrorHook>,
}

impl Dispatch {
    pub(crate) fn new(
        event: &str,
        args: EventArgs,
        snapshot: Snapshot,
        on_error: Option<HandlerErrorHook>,
    ) -> Self {
        Self {
            event: event.to_string(),
            args,
            snapshot,
            on_error,
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.snapshot.len()
    }

    /// Invoke every listener of the snapshot in order.
    ///
    /// A failing listener never stops the ones after it.
    pub(crate) fn run(self) {
        for handler in self.snapshot.iter() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                handler.on_event(&self.event, &self.args)
            }));

            let cause = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => HandlerFailure::Failed(e),
                Err(payload) => HandlerFailure::Panicked(panic_message(payload.as_ref())),
            };

            self.report(HandlerExecutionError::new(&self.event, handler.name(), cause));
        }
    }

    fn report(&self, failure: HandlerExecutionError) {
        error!(
            event = %failure.event,
            handler = %failure.handler,
            error = %failure.cause,
            "Event handler failed"
        );

        if let Some(hook) = &self.on_error {
            if panic::catch_unwind(AssertUnwindSafe(|| hook(&failure))).is_err() {
                error!(event = %failure.event, "Handler error hook panicked");
            }
        }
    }
}
