//! Scoped registrations

use crate::registry::{Added, ListenerId};
use crate::router::RouterInner;
use std::fmt;
use std::sync::Weak;

/// Registration that lasts as long as this handle.
///
/// Dropping the handle, or calling [`unsubscribe`](Self::unsubscribe),
/// removes the listener. The handle does not keep the router alive.
///
/// A handle only removes a registration it created. Subscribing a handler
/// that is already registered for the same event yields a handle that
/// leaves the existing registration in place.
#[must_use = "dropping a Subscription immediately removes its listener"]
pub struct Subscription {
    router: Weak<RouterInner>,
    event: Option<String>,
    id: ListenerId,
    owned: bool,
}

impl Subscription {
    pub(crate) fn new(
        router: Weak<RouterInner>,
        event: Option<String>,
        id: ListenerId,
        added: Added,
    ) -> Self {
        Self {
            router,
            event,
            id,
            owned: matches!(added, Added::Inserted),
        }
    }

    /// Event name, or `None` for a catch-all subscription
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Whether the listener is still registered
    pub fn is_active(&self) -> bool {
        self.router
            .upgrade()
            .is_some_and(|inner| inner.registry.contains(self.event(), self.id))
    }

    /// Whether dropping this handle removes the registration
    pub fn owns_registration(&self) -> bool {
        self.owned
    }

    /// Remove the listener now
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        if let Some(inner) = self.router.upgrade() {
            inner.registry.remove(self.event.as_deref(), self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("owned", &self.owned)
            .finish()
    }
}
