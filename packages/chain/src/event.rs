//! Named events and listener registration.
//!
//! Listeners are registered per event name and compared by identity, so the
//! same `Listener` handed to `on` and later to `remove_listener` refers to the
//! same registration, wherever it was registered from.
//!
//! `EventEmitter` snapshots listeners before calling them:
//!   - A listener removed during emission is still called in that round.
//!   - A listener added during emission is not called until the next emit.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Block, Peer};

/// Built-in event names.
pub mod names {
    pub const READY: &str = "ready";
    pub const APPEND: &str = "append";
    pub const DOWNLOAD: &str = "download";
    pub const UPLOAD: &str = "upload";
    pub const PEER_ADD: &str = "peer-add";
    pub const PEER_REMOVE: &str = "peer-remove";
    pub const CLOSE: &str = "close";
}

/// An event emitted by a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready,
    Append,
    Download { index: u64, block: Block },
    Upload { index: u64, block: Block },
    PeerAdd(Peer),
    PeerRemove(Peer),
    Close,
    /// A user-defined event.
    Custom {
        name: String,
        payload: serde_json::Value,
    },
}

impl Event {
    /// The name listeners subscribe to for this event.
    pub fn name(&self) -> &str {
        match self {
            Event::Ready => names::READY,
            Event::Append => names::APPEND,
            Event::Download { .. } => names::DOWNLOAD,
            Event::Upload { .. } => names::UPLOAD,
            Event::PeerAdd(_) => names::PEER_ADD,
            Event::PeerRemove(_) => names::PEER_REMOVE,
            Event::Close => names::CLOSE,
            Event::Custom { name, .. } => name,
        }
    }
}

/// A shareable event callback with identity.
///
/// Clones refer to the same callback; `same_as` compares that identity.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(&Event) + Send + Sync>);

impl Listener {
    pub fn new(f: impl Fn(&Event) + Send + Sync + 'static) -> Self {
        Listener(Arc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    /// Check whether two listeners are the same registration.
    pub fn same_as(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Subscribe to and unsubscribe from named events.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `&dyn Events`.
pub trait Events {
    /// Register `listener` for events named `event`.
    fn on(&self, event: &str, listener: Listener);

    /// Remove one registration of `listener` for `event`.
    ///
    /// Does nothing if the listener is not registered.
    fn remove_listener(&self, event: &str, listener: &Listener);

    /// Number of listeners registered for `event`.
    fn listener_count(&self, event: &str) -> usize;
}

/// A synchronous, name-keyed event emitter.
///
/// All methods take `&self`; the lock is never held while listeners run, so
/// listeners may subscribe or unsubscribe from inside a callback.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<Vec<(String, Listener)>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call every listener registered for the event's name, in registration
    /// order. Returns whether any listener was called.
    pub fn emit(&self, event: &Event) -> bool {
        let snapshot: Vec<Listener> = {
            let guard = self.listeners.lock();
            guard
                .iter()
                .filter(|(name, _)| name == event.name())
                .map(|(_, listener)| listener.clone())
                .collect()
        };
        for listener in &snapshot {
            listener.call(event);
        }
        !snapshot.is_empty()
    }
}

impl Events for EventEmitter {
    fn on(&self, event: &str, listener: Listener) {
        self.listeners.lock().push((event.to_string(), listener));
    }

    fn remove_listener(&self, event: &str, listener: &Listener) {
        let mut guard = self.listeners.lock();
        // Most recent registration first, so repeated `on` calls unwind in order.
        if let Some(pos) = guard
            .iter()
            .rposition(|(name, l)| name == event && l.same_as(listener))
        {
            guard.remove(pos);
        }
    }

    fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
