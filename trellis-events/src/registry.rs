//! Listener registry
//!
//! The registry keeps one immutable [`RegistryState`] behind an `Arc`. Readers
//! clone the `Arc` under a short read lock and iterate without holding any
//! lock; writers clone the state, apply their change and swap the new state in
//! under the write lock. A reader therefore never observes a partially applied
//! registration, and handlers never run while a registry lock is held.

use crate::handler::EventHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Identity of a registered handler: the address of its shared allocation.
pub(crate) type ListenerId = usize;

pub(crate) fn listener_id<H: ?Sized>(handler: &Arc<H>) -> ListenerId {
    Arc::as_ptr(handler) as *const () as usize
}

/// How the registry holds on to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// The registry keeps the handler alive until it is removed
    Strong,
    /// The registry never keeps the handler alive on its own; once every
    /// other reference is gone it stops being invoked
    Weak,
}

#[derive(Clone)]
pub(crate) enum Slot {
    Strong(Arc<dyn EventHandler>),
    Weak(Weak<dyn EventHandler>),
}

impl Slot {
    pub(crate) fn strong(handler: Arc<dyn EventHandler>) -> Self {
        Slot::Strong(handler)
    }

    pub(crate) fn weak(handler: &Arc<dyn EventHandler>) -> Self {
        Slot::Weak(Arc::downgrade(handler))
    }

    fn resolve(&self) -> Option<Arc<dyn EventHandler>> {
        match self {
            Slot::Strong(handler) => Some(Arc::clone(handler)),
            Slot::Weak(handler) => handler.upgrade(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Slot::Strong(_) => true,
            Slot::Weak(handler) => handler.strong_count() > 0,
        }
    }

    fn retention(&self) -> Retention {
        match self {
            Slot::Strong(_) => Retention::Strong,
            Slot::Weak(_) => Retention::Weak,
        }
    }
}

#[derive(Clone)]
struct Entry {
    id: ListenerId,
    slot: Slot,
}

#[derive(Clone, Default)]
struct RegistryState {
    catch_all: Vec<Entry>,
    named: HashMap<String, Vec<Entry>>,
}

impl RegistryState {
    fn entries_mut(&mut self, event: Option<&str>) -> &mut Vec<Entry> {
        match event {
            None => &mut self.catch_all,
            Some(name) => self.named.entry(name.to_string()).or_default(),
        }
    }

    fn entries(&self, event: Option<&str>) -> &[Entry] {
        match event {
            None => &self.catch_all,
            Some(name) => self.named.get(name).map(Vec::as_slice).unwrap_or_default(),
        }
    }

    fn len(&self) -> usize {
        self.catch_all.len() + self.named.values().map(Vec::len).sum::<usize>()
    }
}

/// Outcome of an add request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Added {
    Inserted,
    AlreadyRegistered(Retention),
}

pub(crate) struct Registry {
    enabled: AtomicBool,
    state: RwLock<Arc<RegistryState>>,
}

impl Registry {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            state: RwLock::new(Arc::new(RegistryState::default())),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn current(&self) -> Arc<RegistryState> {
        Arc::clone(&self.state.read())
    }

    /// Apply `change` to a copy of the state and publish the copy.
    ///
    /// `change` returns `false` when it left the state untouched. The replaced
    /// state is dropped after the write lock is released, so a handler whose
    /// last reference goes away here may itself use the router from `Drop`.
    fn mutate<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut RegistryState) -> bool,
    {
        let mut guard = self.state.write();
        let mut next = RegistryState::clone(&guard);
        if !change(&mut next) {
            return false;
        }
        let previous = std::mem::replace(&mut *guard, Arc::new(next));
        drop(guard);
        drop(previous);
        true
    }

    pub(crate) fn add(&self, event: Option<&str>, id: ListenerId, slot: Slot) -> Added {
        let mut existing = None;
        self.mutate(|state| {
            let entries = state.entries_mut(event);
            if let Some(entry) = entries.iter().find(|e| e.id == id && e.slot.is_alive()) {
                existing = Some(entry.slot.retention());
                return false;
            }
            entries.retain(|e| e.id != id);
            entries.push(Entry { id, slot });
            true
        });

        match existing {
            Some(retention) => Added::AlreadyRegistered(retention),
            None => Added::Inserted,
        }
    }

    pub(crate) fn remove(&self, event: Option<&str>, id: ListenerId) -> bool {
        self.mutate(|state| match event {
            None => {
                let before = state.catch_all.len();
                state.catch_all.retain(|e| e.id != id);
                state.catch_all.len() != before
            }
            Some(name) => match state.named.get_mut(name) {
                Some(entries) => {
                    let before = entries.len();
                    entries.retain(|e| e.id != id);
                    let removed = entries.len() != before;
                    if entries.is_empty() {
                        state.named.remove(name);
                    }
                    removed
                }
                None => false,
            },
        })
    }

    pub(crate) fn contains(&self, event: Option<&str>, id: ListenerId) -> bool {
        self.current()
            .entries(event)
            .iter()
            .any(|e| e.id == id && e.slot.is_alive())
    }

    /// Resolve the listeners for `event`: catch-all first, then named, each
    /// in registration order. Empty while the registry is disabled.
    pub(crate) fn snapshot(&self, event: &str) -> Snapshot {
        if !self.is_enabled() {
            return Snapshot::default();
        }

        let state = self.current();
        let mut listeners = Vec::new();
        let mut found_dead = false;

        for entry in state.catch_all.iter().chain(state.entries(Some(event))) {
            match entry.slot.resolve() {
                Some(handler) => listeners.push(handler),
                None => found_dead = true,
            }
        }
        drop(state);

        if found_dead {
            self.purge_dead();
        }

        Snapshot { listeners }
    }

    fn purge_dead(&self) {
        let purged = self.mutate(|state| {
            let before = state.len();
            state.catch_all.retain(|e| e.slot.is_alive());
            for entries in state.named.values_mut() {
                entries.retain(|e| e.slot.is_alive());
            }
            state.named.retain(|_, entries| !entries.is_empty());
            state.len() != before
        });

        if purged {
            tracing::trace!("Purged reclaimed weak listeners");
        }
    }

    /// Registered entries, including weak entries not yet purged
    pub(crate) fn len(&self) -> usize {
        self.current().len()
    }

    pub(crate) fn len_for(&self, event: Option<&str>) -> usize {
        self.current().entries(event).len()
    }

    pub(crate) fn clear(&self) {
        self.mutate(|state| {
            let had_entries = state.len() > 0;
            state.catch_all.clear();
            state.named.clear();
            had_entries
        });
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("enabled", &self.is_enabled())
            .field("listener_count", &self.len())
            .finish()
    }
}

/// Immutable, ordered view of the listeners that apply to one event name.
///
/// Taken once per publish; later registrations or removals do not change a
/// snapshot that already exists.
#[derive(Clone, Default)]
pub struct Snapshot {
    listeners: Vec<Arc<dyn EventHandler>>,
}

impl Snapshot {
    /// Number of listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener applies
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Iterate in invocation order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EventHandler>> {
        self.listeners.iter()
    }

    /// Whether `handler` is part of this snapshot
    pub fn contains<H: ?Sized>(&self, handler: &Arc<H>) -> bool {
        let id = listener_id(handler);
        self.listeners.iter().any(|l| listener_id(l) == id)
    }

    /// Handler names in invocation order
    pub fn names(&self) -> Vec<&str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
